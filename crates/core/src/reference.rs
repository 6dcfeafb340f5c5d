use std::sync::Arc;

use crate::config::QuoteRequestConfig;
use crate::domain::quote_request::QuoteRequest;
use crate::domain::version::QuoteRequestVersion;
use crate::errors::QuoteRequestError;
use crate::ports::{SequenceNumberGenerator, SequenceNumberSettings};

/// Human-facing identifiers. Quote request references are
/// `<customer reference><sep><sequence>`, with one sequence per customer;
/// version references append the version number to the parent reference.
#[derive(Clone)]
pub struct QuoteRequestReferenceGenerator {
    sequence: Arc<dyn SequenceNumberGenerator>,
    sequence_name: String,
    separator: String,
}

impl QuoteRequestReferenceGenerator {
    pub fn new(sequence: Arc<dyn SequenceNumberGenerator>, config: &QuoteRequestConfig) -> Self {
        Self {
            sequence,
            sequence_name: config.sequence_name.clone(),
            separator: config.reference_separator.clone(),
        }
    }

    pub fn sequence_settings(&self, customer_reference: &str) -> SequenceNumberSettings {
        SequenceNumberSettings {
            name: format!("{}:{customer_reference}", self.sequence_name),
            prefix: Some(format!("{customer_reference}{}", self.separator)),
            padding: 0,
        }
    }

    pub async fn generate_quote_request_reference(
        &self,
        customer_reference: &str,
    ) -> Result<String, QuoteRequestError> {
        self.sequence.generate(&self.sequence_settings(customer_reference)).await
    }

    pub fn generate_version_reference(
        &self,
        quote_request: &QuoteRequest,
        version: &QuoteRequestVersion,
    ) -> Result<String, QuoteRequestError> {
        let reference = quote_request.reference().ok_or(QuoteRequestError::RequiredField {
            field: "quote_request.quote_request_reference",
        })?;

        Ok(format!("{reference}{}{}", self.separator, version.version))
    }
}

impl std::fmt::Debug for QuoteRequestReferenceGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteRequestReferenceGenerator")
            .field("sequence_name", &self.sequence_name)
            .field("separator", &self.separator)
            .finish_non_exhaustive()
    }
}
