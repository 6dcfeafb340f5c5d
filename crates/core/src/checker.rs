use std::sync::Arc;

use crate::domain::quote::Quote;
use crate::domain::quote_request::QuoteRequest;
use crate::domain::status::QuoteRequestStatus;
use crate::ports::{Clock, SystemClock};

pub trait QuoteRequestChecker: Send + Sync {
    /// The agent's offer is visible and has not expired.
    fn is_quote_request_ready(&self, quote_request: &QuoteRequest) -> bool;
    fn is_quote_request_draft(&self, quote_request: &QuoteRequest) -> bool;
}

#[derive(Clone)]
pub struct StatusQuoteRequestChecker {
    clock: Arc<dyn Clock>,
}

impl StatusQuoteRequestChecker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for StatusQuoteRequestChecker {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl QuoteRequestChecker for StatusQuoteRequestChecker {
    fn is_quote_request_ready(&self, quote_request: &QuoteRequest) -> bool {
        if !quote_request.has_status(QuoteRequestStatus::Ready) {
            return false;
        }

        quote_request.valid_until.map_or(true, |valid_until| valid_until > self.clock.now())
    }

    fn is_quote_request_draft(&self, quote_request: &QuoteRequest) -> bool {
        quote_request.has_status(QuoteRequestStatus::Draft)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct QuoteChecker;

impl QuoteChecker {
    pub fn is_quote_request_reference_set(&self, quote: &Quote) -> bool {
        quote.quote_request_reference.as_deref().is_some_and(|reference| !reference.is_empty())
    }

    pub fn is_quote_request_version_reference_set(&self, quote: &Quote) -> bool {
        quote
            .quote_request_version_reference
            .as_deref()
            .is_some_and(|reference| !reference.is_empty())
    }
}
