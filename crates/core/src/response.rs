use serde::{Deserialize, Serialize};

use crate::domain::quote::Quote;
use crate::domain::quote_request::QuoteRequest;

pub const MESSAGE_QUOTE_REQUEST_NOT_EXISTS: &str = "quote_request.validation.error.not_exists";
pub const MESSAGE_QUOTE_REQUEST_WRONG_STATUS: &str = "quote_request.validation.error.wrong_status";
pub const MESSAGE_QUOTE_REQUEST_COMPANY_USER_NOT_FOUND: &str =
    "quote_request.validation.error.company_user_not_found";
pub const MESSAGE_QUOTE_REQUEST_WRONG_VALID_UNTIL: &str =
    "quote_request.update.validation.error.wrong_valid_until";
pub const MESSAGE_CHECKOUT_WRONG_QUOTE_REQUEST_STATUS: &str =
    "quote_request.checkout.validation.error.wrong_status";

/// Outcome of a writer call. Business-rule rejections are reported here with
/// one message code per violation; callers branch on `is_success`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequestResponse {
    pub is_success: bool,
    pub quote_request: Option<QuoteRequest>,
    pub errors: Vec<String>,
}

impl QuoteRequestResponse {
    pub fn success(quote_request: QuoteRequest) -> Self {
        Self { is_success: true, quote_request: Some(quote_request), errors: Vec::new() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { is_success: false, quote_request: None, errors: vec![message.into()] }
    }

    /// Failure without a message code, used when the criteria carry no
    /// reference to look up.
    pub fn failure() -> Self {
        Self::default()
    }

    pub fn not_exists() -> Self {
        Self::error(MESSAGE_QUOTE_REQUEST_NOT_EXISTS)
    }

    pub fn wrong_status() -> Self {
        Self::error(MESSAGE_QUOTE_REQUEST_WRONG_STATUS)
    }

    pub fn has_error(&self, message: &str) -> bool {
        self.errors.iter().any(|error| error == message)
    }
}

/// Cart-side outcome for quote-to-cart conversion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub is_successful: bool,
    pub quote: Option<Quote>,
    pub errors: Vec<String>,
}

impl QuoteResponse {
    pub fn success(quote: Quote) -> Self {
        Self { is_successful: true, quote: Some(quote), errors: Vec::new() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { is_successful: false, quote: None, errors: vec![message.into()] }
    }
}
