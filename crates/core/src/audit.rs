use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::status::QuoteRequestStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditCategory {
    Customer,
    Agent,
    Conversion,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub quote_request_reference: Option<String>,
    pub correlation_id: String,
    pub event_type: String,
    pub category: AuditCategory,
    pub actor: String,
    pub outcome: AuditOutcome,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        quote_request_reference: Option<String>,
        event_type: impl Into<String>,
        category: AuditCategory,
        actor: impl Into<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            quote_request_reference,
            correlation_id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            category,
            actor: actor.into(),
            outcome,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Records the `from` and `to` statuses of a transition.
    pub fn with_transition(
        self,
        from: Option<QuoteRequestStatus>,
        to: Option<QuoteRequestStatus>,
    ) -> Self {
        let status = |status: Option<QuoteRequestStatus>| {
            status.map_or_else(|| "none".to_owned(), |status| status.as_str().to_owned())
        };
        self.with_metadata("from", status(from)).with_metadata("to", status(to))
    }

    pub fn with_errors(self, errors: &[String]) -> Self {
        if errors.is_empty() {
            return self;
        }
        self.with_metadata("errors", errors.join(","))
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<AuditEvent> {
        self.events().into_iter().filter(|event| event.event_type == event_type).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink},
        domain::status::QuoteRequestStatus,
    };

    #[test]
    fn in_memory_sink_records_transition_metadata() {
        let sink = InMemoryAuditSink::default();
        sink.emit(
            AuditEvent::new(
                Some("DE--1-1".to_owned()),
                "quote_request.canceled",
                AuditCategory::Customer,
                "company-user:1",
                AuditOutcome::Success,
            )
            .with_correlation_id("req-123")
            .with_transition(Some(QuoteRequestStatus::Waiting), Some(QuoteRequestStatus::Canceled)),
        );

        let events = sink.events_of_type("quote_request.canceled");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].correlation_id, "req-123");
        assert_eq!(events[0].quote_request_reference.as_deref(), Some("DE--1-1"));
        assert_eq!(events[0].metadata.get("from").map(String::as_str), Some("waiting"));
        assert_eq!(events[0].metadata.get("to").map(String::as_str), Some("canceled"));
    }

    #[test]
    fn empty_error_list_adds_no_metadata() {
        let event = AuditEvent::new(
            None,
            "quote_request.create",
            AuditCategory::Agent,
            "agent",
            AuditOutcome::Rejected,
        )
        .with_errors(&[]);

        assert!(!event.metadata.contains_key("errors"));
    }
}
