use thiserror::Error;

/// Hard failures. Business-rule rejections never surface here; they travel
/// in the response envelopes.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QuoteRequestError {
    #[error("required field `{field}` is missing")]
    RequiredField { field: &'static str },
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl QuoteRequestError {
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::RequiredField { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::QuoteRequestError;

    #[test]
    fn required_field_names_the_missing_path() {
        let error = QuoteRequestError::RequiredField { field: "quote_request.company_user" };

        assert!(error.is_contract_violation());
        assert_eq!(error.to_string(), "required field `quote_request.company_user` is missing");
    }

    #[test]
    fn collaborator_failures_are_not_contract_violations() {
        assert!(!QuoteRequestError::Persistence("database is locked".to_owned())
            .is_contract_violation());
        assert!(!QuoteRequestError::Integration("calculation offline".to_owned())
            .is_contract_violation());
    }
}
