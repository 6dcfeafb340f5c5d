//! Lifecycle writers. `customer` holds the actions available to the company
//! user who owns a request; `agent` holds the sales-side actions.

pub mod agent;
pub mod customer;

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink};
use crate::domain::quote_request::QuoteRequest;
use crate::domain::status::QuoteRequestStatus;
use crate::domain::version::QuoteRequestVersion;
use crate::errors::QuoteRequestError;
use crate::ports::{
    Clock, CompanyUserResolver, QuoteRequestEntityManager, QuoteRequestRepository, SystemClock,
};
use crate::reference::QuoteRequestReferenceGenerator;
use crate::response::QuoteRequestResponse;
use crate::sanitizer::QuoteRequestVersionSanitizer;

pub use agent::UserQuoteRequestWriter;
pub use customer::QuoteRequestWriter;

/// Collaborators shared by both writers.
#[derive(Clone)]
pub struct WriterCollaborators {
    pub repository: Arc<dyn QuoteRequestRepository>,
    pub entity_manager: Arc<dyn QuoteRequestEntityManager>,
    pub company_user_resolver: Arc<dyn CompanyUserResolver>,
    pub sanitizer: QuoteRequestVersionSanitizer,
    pub references: QuoteRequestReferenceGenerator,
    pub clock: Arc<dyn Clock>,
    pub audit: Arc<dyn AuditSink>,
}

impl WriterCollaborators {
    pub fn new(
        repository: Arc<dyn QuoteRequestRepository>,
        entity_manager: Arc<dyn QuoteRequestEntityManager>,
        company_user_resolver: Arc<dyn CompanyUserResolver>,
        sanitizer: QuoteRequestVersionSanitizer,
        references: QuoteRequestReferenceGenerator,
    ) -> Self {
        Self {
            repository,
            entity_manager,
            company_user_resolver,
            sanitizer,
            references,
            clock: Arc::new(SystemClock),
            audit: Arc::new(NoopAuditSink),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Persists a brand new aggregate and its first version in one unit of
    /// work. A storage failure is audited and returned.
    pub(crate) async fn persist_new(
        &self,
        decision: Decision<'_>,
        quote_request: QuoteRequest,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        let reference = quote_request.quote_request_reference.clone();
        let decision =
            Decision { reference: decision.reference.or(reference.as_deref()), ..decision };
        let version_reference = self
            .references
            .generate_version_reference(&quote_request, &version)
            .map_err(|error| self.fail(decision, None, error))?;

        self.entity_manager
            .create_quote_request_with_version(
                QuoteRequest { latest_version: None, ..quote_request },
                QuoteRequestVersion { version_reference: Some(version_reference), ..version },
            )
            .await
            .map_err(|error| self.fail(decision, None, error))
    }

    /// Stores root fields while keeping the version the caller already holds.
    pub(crate) async fn persist_root(
        &self,
        decision: Decision<'_>,
        from: Option<QuoteRequestStatus>,
        quote_request: QuoteRequest,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        let latest_version = quote_request.latest_version.clone();
        let mut updated = self
            .entity_manager
            .update_quote_request(quote_request)
            .await
            .map_err(|error| self.fail(decision, from, error))?;
        if latest_version.is_some() {
            updated.latest_version = latest_version;
        }
        Ok(updated)
    }

    /// Stores root fields and appends `version` in one unit of work.
    pub(crate) async fn persist_revision(
        &self,
        decision: Decision<'_>,
        from: Option<QuoteRequestStatus>,
        quote_request: QuoteRequest,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        self.entity_manager
            .revise_quote_request(quote_request, version)
            .await
            .map_err(|error| self.fail(decision, from, error))
    }

    /// Logs and audits a hard failure, then hands the error back.
    pub(crate) fn fail(
        &self,
        decision: Decision<'_>,
        from: Option<QuoteRequestStatus>,
        error: QuoteRequestError,
    ) -> QuoteRequestError {
        error!(
            event_name = decision.event_type,
            actor = decision.actor,
            quote_request_reference = decision.reference.unwrap_or("unknown"),
            error = %error,
            "quote request transition failed"
        );
        self.audit.emit(
            AuditEvent::new(
                decision.reference.map(str::to_owned),
                decision.event_type,
                decision.category,
                decision.actor,
                AuditOutcome::Failed,
            )
            .with_transition(from, from)
            .with_metadata("error", error.to_string()),
        );
        error
    }

    /// Logs and audits a writer decision, then hands the response back.
    pub(crate) fn record(
        &self,
        decision: Decision<'_>,
        from: Option<QuoteRequestStatus>,
        response: QuoteRequestResponse,
    ) -> QuoteRequestResponse {
        let reference = response
            .quote_request
            .as_ref()
            .and_then(QuoteRequest::reference)
            .or(decision.reference)
            .map(str::to_owned);
        let to = response.quote_request.as_ref().and_then(|quote_request| quote_request.status);
        let outcome = if response.is_success { AuditOutcome::Success } else { AuditOutcome::Rejected };

        if response.is_success {
            info!(
                event_name = decision.event_type,
                actor = decision.actor,
                quote_request_reference = reference.as_deref().unwrap_or("unknown"),
                to = to.map_or("none", |status| status.as_str()),
                "quote request transition applied"
            );
        } else {
            warn!(
                event_name = decision.event_type,
                actor = decision.actor,
                quote_request_reference = reference.as_deref().unwrap_or("unknown"),
                errors = %response.errors.join(","),
                "quote request transition rejected"
            );
        }

        self.audit.emit(
            AuditEvent::new(reference, decision.event_type, decision.category, decision.actor, outcome)
                .with_transition(from, if response.is_success { to } else { from })
                .with_errors(&response.errors),
        );
        response
    }
}

impl std::fmt::Debug for WriterCollaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterCollaborators")
            .field("references", &self.references)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Decision<'a> {
    pub event_type: &'static str,
    pub category: AuditCategory,
    pub actor: &'a str,
    pub reference: Option<&'a str>,
}
