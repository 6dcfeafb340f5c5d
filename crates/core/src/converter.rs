use std::sync::Arc;

use tracing::{info, warn};

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink};
use crate::checker::QuoteRequestChecker;
use crate::domain::quote::Quote;
use crate::domain::quote_request::QuoteRequest;
use crate::errors::QuoteRequestError;
use crate::ports::CartClient;
use crate::response::{QuoteResponse, MESSAGE_CHECKOUT_WRONG_QUOTE_REQUEST_STATUS};

/// Hands the quote of an accepted version over to the customer's cart.
#[derive(Clone)]
pub struct QuoteRequestToQuoteConverter {
    cart: Arc<dyn CartClient>,
    checker: Arc<dyn QuoteRequestChecker>,
    audit: Arc<dyn AuditSink>,
}

impl QuoteRequestToQuoteConverter {
    pub fn new(cart: Arc<dyn CartClient>, checker: Arc<dyn QuoteRequestChecker>) -> Self {
        Self { cart, checker, audit: Arc::new(NoopAuditSink) }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Editable copy for a draft request, named after the request itself.
    pub async fn convert_quote_request_to_quote(
        &self,
        quote_request: &QuoteRequest,
    ) -> Result<QuoteResponse, QuoteRequestError> {
        const EVENT: &str = "quote_request.convert_to_quote";
        if !self.checker.is_quote_request_draft(quote_request) {
            return Ok(self.reject(EVENT, quote_request));
        }

        let reference = quote_request.reference().map(str::to_owned);
        let mut quote = latest_quote(quote_request);
        quote.quote_request_version_reference = version_reference(quote_request);
        quote.quote_request_reference = reference.clone();
        quote.name = reference;

        let response = self.cart.persist_customer_quote(quote).await?;
        Ok(self.record(EVENT, quote_request, response))
    }

    /// Price-locked copy of a ready offer, named after the accepted version.
    pub async fn convert_quote_request_to_locked_quote(
        &self,
        quote_request: &QuoteRequest,
    ) -> Result<QuoteResponse, QuoteRequestError> {
        const EVENT: &str = "quote_request.convert_to_locked_quote";
        if !self.checker.is_quote_request_ready(quote_request) {
            return Ok(self.reject(EVENT, quote_request));
        }

        let version_reference = version_reference(quote_request);
        let mut quote = latest_quote(quote_request);
        quote.quote_request_reference = quote_request.reference().map(str::to_owned);
        quote.quote_request_version_reference = version_reference.clone();
        quote.name = version_reference;

        let locked = self.cart.lock_quote(quote).await?;
        let response = self.cart.persist_customer_quote(locked).await?;
        Ok(self.record(EVENT, quote_request, response))
    }

    fn reject(&self, event_type: &'static str, quote_request: &QuoteRequest) -> QuoteResponse {
        self.record(
            event_type,
            quote_request,
            QuoteResponse::error(MESSAGE_CHECKOUT_WRONG_QUOTE_REQUEST_STATUS),
        )
    }

    fn record(
        &self,
        event_type: &'static str,
        quote_request: &QuoteRequest,
        response: QuoteResponse,
    ) -> QuoteResponse {
        let reference = quote_request.reference().map(str::to_owned);
        let outcome = if response.is_successful {
            info!(
                event_name = event_type,
                quote_request_reference = reference.as_deref().unwrap_or("unknown"),
                "quote request converted to cart quote"
            );
            AuditOutcome::Success
        } else {
            warn!(
                event_name = event_type,
                quote_request_reference = reference.as_deref().unwrap_or("unknown"),
                errors = %response.errors.join(","),
                "quote request conversion rejected"
            );
            AuditOutcome::Rejected
        };

        self.audit.emit(
            AuditEvent::new(reference, event_type, AuditCategory::Conversion, "customer", outcome)
                .with_transition(quote_request.status, quote_request.status)
                .with_errors(&response.errors),
        );
        response
    }
}

impl std::fmt::Debug for QuoteRequestToQuoteConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteRequestToQuoteConverter").finish_non_exhaustive()
    }
}

fn latest_quote(quote_request: &QuoteRequest) -> Quote {
    quote_request
        .latest_version
        .as_ref()
        .and_then(|version| version.quote.clone())
        .unwrap_or_default()
}

fn version_reference(quote_request: &QuoteRequest) -> Option<String> {
    quote_request.latest_version.as_ref().and_then(|version| version.version_reference.clone())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::QuoteRequestToQuoteConverter;
    use crate::audit::{AuditOutcome, InMemoryAuditSink};
    use crate::checker::{QuoteChecker, StatusQuoteRequestChecker};
    use crate::domain::quote_request::QuoteRequest;
    use crate::domain::status::QuoteRequestStatus;
    use crate::fixtures::{fixed_now, waiting_request, StubCart};
    use crate::ports::FixedClock;
    use crate::response::MESSAGE_CHECKOUT_WRONG_QUOTE_REQUEST_STATUS;

    fn converter(cart: Arc<StubCart>) -> QuoteRequestToQuoteConverter {
        QuoteRequestToQuoteConverter::new(
            cart,
            Arc::new(StatusQuoteRequestChecker::new(Arc::new(FixedClock(fixed_now())))),
        )
    }

    fn with_status(status: QuoteRequestStatus) -> QuoteRequest {
        waiting_request("DE--1-1").with_status(status)
    }

    #[tokio::test]
    async fn draft_request_converts_to_a_quote_named_after_the_request() {
        let cart = Arc::new(StubCart::default());

        let response = converter(cart.clone())
            .convert_quote_request_to_quote(&with_status(QuoteRequestStatus::Draft))
            .await
            .expect("convert");

        assert!(response.is_successful);
        let quote = response.quote.expect("quote");
        assert_eq!(quote.name.as_deref(), Some("DE--1-1"));
        assert_eq!(quote.quote_request_reference.as_deref(), Some("DE--1-1"));
        assert_eq!(quote.quote_request_version_reference.as_deref(), Some("DE--1-1-1"));
        assert!(!quote.is_locked);
        assert!(QuoteChecker.is_quote_request_reference_set(&quote));
        assert_eq!(cart.persisted().len(), 1);
    }

    #[tokio::test]
    async fn non_draft_request_is_not_converted() {
        let cart = Arc::new(StubCart::default());

        let response = converter(cart.clone())
            .convert_quote_request_to_quote(&with_status(QuoteRequestStatus::Waiting))
            .await
            .expect("convert");

        assert!(!response.is_successful);
        assert_eq!(response.errors, vec![MESSAGE_CHECKOUT_WRONG_QUOTE_REQUEST_STATUS.to_owned()]);
        assert!(cart.persisted().is_empty());
    }

    #[tokio::test]
    async fn ready_request_converts_to_a_locked_quote_named_after_the_version() {
        let cart = Arc::new(StubCart::default());
        let audit = InMemoryAuditSink::default();
        let request = with_status(QuoteRequestStatus::Ready)
            .with_valid_until(Some(fixed_now() + Duration::days(1)));

        let response = converter(cart.clone())
            .with_audit(Arc::new(audit.clone()))
            .convert_quote_request_to_locked_quote(&request)
            .await
            .expect("convert");

        assert!(response.is_successful);
        let quote = response.quote.expect("quote");
        assert!(quote.is_locked);
        assert_eq!(quote.name.as_deref(), Some("DE--1-1-1"));
        assert!(QuoteChecker.is_quote_request_version_reference_set(&quote));
        assert_eq!(audit.events()[0].outcome, AuditOutcome::Success);
    }

    #[tokio::test]
    async fn expired_offer_is_not_locked() {
        let cart = Arc::new(StubCart::default());
        let request = with_status(QuoteRequestStatus::Ready)
            .with_valid_until(Some(fixed_now() - Duration::minutes(1)));

        let response = converter(cart.clone())
            .convert_quote_request_to_locked_quote(&request)
            .await
            .expect("convert");

        assert!(!response.is_successful);
        assert!(cart.persisted().is_empty());
    }

    #[tokio::test]
    async fn cart_rejection_is_passed_through() {
        let cart = Arc::new(StubCart::rejecting("quote.validation.error.locked"));

        let response = converter(cart)
            .convert_quote_request_to_quote(&with_status(QuoteRequestStatus::Draft))
            .await
            .expect("convert");

        assert_eq!(response.errors, vec!["quote.validation.error.locked".to_owned()]);
    }
}
