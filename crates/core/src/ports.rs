//! Collaborators the writers and the converter are built against.
//!
//! Storage implementations must run each writer call's load, validate,
//! mutate and persist against a consistent view of the aggregate; the core
//! performs no locking of its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::quote::Quote;
use crate::domain::quote_request::{CompanyUser, CompanyUserId, QuoteRequest, QuoteRequestCriteria};
use crate::domain::version::QuoteRequestVersion;
use crate::errors::QuoteRequestError;
use crate::response::QuoteResponse;

#[async_trait]
pub trait QuoteRequestRepository: Send + Sync {
    /// Loads an aggregate by reference, optionally scoped to the owning
    /// company user.
    async fn find_by_reference(
        &self,
        reference: &str,
        company_user: Option<&CompanyUserId>,
    ) -> Result<Option<QuoteRequest>, QuoteRequestError>;

    async fn find_by_criteria(
        &self,
        criteria: &QuoteRequestCriteria,
    ) -> Result<Option<QuoteRequest>, QuoteRequestError>;
}

#[async_trait]
pub trait QuoteRequestEntityManager: Send + Sync {
    /// Stores a new root and assigns `id_quote_request`. The returned value
    /// carries `state_version == 1`.
    async fn create_quote_request(
        &self,
        quote_request: QuoteRequest,
    ) -> Result<QuoteRequest, QuoteRequestError>;

    /// Stores root fields. Fails when the stored `state_version` differs from
    /// the one carried by `quote_request`; on success the version is bumped.
    async fn update_quote_request(
        &self,
        quote_request: QuoteRequest,
    ) -> Result<QuoteRequest, QuoteRequestError>;

    async fn create_quote_request_version(
        &self,
        id_quote_request: i64,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequestVersion, QuoteRequestError>;

    /// Rewrites the metadata of a stored version. The quote snapshot of a
    /// version is never changed once written.
    async fn update_quote_request_version(
        &self,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequestVersion, QuoteRequestError>;

    /// Stores a new root and its first version as one unit of work. Either
    /// both are stored or neither is. The returned aggregate carries the
    /// stored version as `latest_version`.
    async fn create_quote_request_with_version(
        &self,
        quote_request: QuoteRequest,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequest, QuoteRequestError>;

    /// Stores root fields under the same `state_version` check as
    /// `update_quote_request` and appends `version`, as one unit of work.
    async fn revise_quote_request(
        &self,
        quote_request: QuoteRequest,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequest, QuoteRequestError>;
}

#[async_trait]
pub trait CompanyUserResolver: Send + Sync {
    async fn resolve_customer_reference(
        &self,
        company_user: &CompanyUser,
    ) -> Result<Option<String>, QuoteRequestError>;
}

/// Resolves the customer reference already embedded in the company user.
#[derive(Clone, Debug, Default)]
pub struct EmbeddedCustomerReferenceResolver;

#[async_trait]
impl CompanyUserResolver for EmbeddedCustomerReferenceResolver {
    async fn resolve_customer_reference(
        &self,
        company_user: &CompanyUser,
    ) -> Result<Option<String>, QuoteRequestError> {
        Ok(company_user.customer_reference().map(str::to_owned))
    }
}

#[async_trait]
pub trait Calculation: Send + Sync {
    async fn recalculate(&self, quote: Quote) -> Result<Quote, QuoteRequestError>;
}

/// Server-side cart operations.
#[async_trait]
pub trait CartFacade: Send + Sync {
    async fn reload_items(&self, quote: Quote) -> Result<Quote, QuoteRequestError>;
}

/// Customer-session cart operations used at checkout conversion.
#[async_trait]
pub trait CartClient: Send + Sync {
    async fn lock_quote(&self, quote: Quote) -> Result<Quote, QuoteRequestError>;
    async fn persist_customer_quote(&self, quote: Quote) -> Result<QuoteResponse, QuoteRequestError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceNumberSettings {
    pub name: String,
    pub prefix: Option<String>,
    pub padding: usize,
}

#[async_trait]
pub trait SequenceNumberGenerator: Send + Sync {
    /// Returns a value never handed out before for `settings.name`.
    async fn generate(&self, settings: &SequenceNumberSettings) -> Result<String, QuoteRequestError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{CompanyUserResolver, EmbeddedCustomerReferenceResolver};
    use crate::domain::quote_request::CompanyUser;

    #[tokio::test]
    async fn embedded_resolver_reads_the_customer_reference() {
        let resolver = EmbeddedCustomerReferenceResolver;

        let found = resolver
            .resolve_customer_reference(&CompanyUser::new("1").with_customer_reference("DE--1"))
            .await
            .expect("resolve");
        let missing =
            resolver.resolve_customer_reference(&CompanyUser::new("1")).await.expect("resolve");

        assert_eq!(found.as_deref(), Some("DE--1"));
        assert_eq!(missing, None);
    }
}
