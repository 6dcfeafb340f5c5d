use thiserror::Error;

use quote_request_core::errors::QuoteRequestError;

pub mod memory;
pub mod quote_request;
pub mod sequence;

pub use memory::{InMemoryQuoteRequestStore, InMemorySequenceNumberGenerator};
pub use quote_request::SqlQuoteRequestStore;
pub use sequence::SqlSequenceNumberGenerator;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("quote request `{reference}` was changed concurrently or already exists")]
    Conflict { reference: String },
    #[error("required field `{field}` is missing")]
    MissingField { field: &'static str },
}

impl From<RepositoryError> for QuoteRequestError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::MissingField { field } => Self::RequiredField { field },
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use quote_request_core::errors::QuoteRequestError;

    use super::RepositoryError;

    #[test]
    fn conflicts_surface_as_persistence_failures() {
        let error: QuoteRequestError =
            RepositoryError::Conflict { reference: "DE--1-1".to_owned() }.into();

        assert!(matches!(
            error,
            QuoteRequestError::Persistence(message) if message.contains("DE--1-1")
        ));
    }

    #[test]
    fn missing_fields_stay_contract_violations() {
        let error: QuoteRequestError =
            RepositoryError::MissingField { field: "quote_request.status" }.into();

        assert_eq!(error, QuoteRequestError::RequiredField { field: "quote_request.status" });
    }
}
