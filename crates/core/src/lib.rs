pub mod audit;
pub mod checker;
pub mod config;
pub mod converter;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod reference;
pub mod response;
pub mod sanitizer;
pub mod status_policy;
pub mod writer;

#[cfg(test)]
pub(crate) mod fixtures;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use checker::{QuoteChecker, QuoteRequestChecker, StatusQuoteRequestChecker};
pub use config::{AppConfig, ConfigError, LoadOptions, QuoteRequestConfig};
pub use converter::QuoteRequestToQuoteConverter;
pub use domain::quote::{Quote, QuoteItem, QuoteTotals, Shipment};
pub use domain::quote_request::{
    CompanyUser, CompanyUserId, Customer, QuoteRequest, QuoteRequestCriteria, QuoteRequestFilter,
};
pub use domain::status::QuoteRequestStatus;
pub use domain::version::{QuoteRequestVersion, QuoteRequestVersionMetadata};
pub use errors::QuoteRequestError;
pub use reference::QuoteRequestReferenceGenerator;
pub use response::{QuoteRequestResponse, QuoteResponse};
pub use sanitizer::QuoteRequestVersionSanitizer;
pub use status_policy::StatusPolicy;
pub use writer::{QuoteRequestWriter, UserQuoteRequestWriter, WriterCollaborators};
