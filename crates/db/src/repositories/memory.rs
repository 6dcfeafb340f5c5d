use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use quote_request_core::domain::quote_request::{CompanyUserId, QuoteRequest, QuoteRequestCriteria};
use quote_request_core::domain::version::QuoteRequestVersion;
use quote_request_core::errors::QuoteRequestError;
use quote_request_core::ports::{
    QuoteRequestEntityManager, QuoteRequestRepository, SequenceNumberGenerator,
    SequenceNumberSettings,
};

use super::sequence::format_sequence;
use super::RepositoryError;

#[derive(Clone, Default)]
struct Tables {
    next_id: i64,
    next_version_id: i64,
    quote_requests: BTreeMap<i64, QuoteRequest>,
    versions: BTreeMap<i64, Vec<QuoteRequestVersion>>,
}

impl Tables {
    fn assemble(&self, id: i64) -> Option<QuoteRequest> {
        let mut quote_request = self.quote_requests.get(&id)?.clone();
        quote_request.latest_version =
            self.versions.get(&id).and_then(|versions| versions.last().cloned());
        Some(quote_request)
    }

    fn find(&self, reference: &str, id_company_user: Option<&CompanyUserId>) -> Option<i64> {
        self.quote_requests.iter().find_map(|(id, quote_request)| {
            let owner = quote_request
                .company_user
                .as_ref()
                .and_then(|company_user| company_user.id_company_user.as_ref());
            let matches = quote_request.reference() == Some(reference)
                && id_company_user.map_or(true, |expected| owner == Some(expected));
            matches.then_some(*id)
        })
    }

    fn lost(id: i64) -> QuoteRequestError {
        RepositoryError::Decode(format!("lost row {id}")).into()
    }

    fn insert(&mut self, quote_request: QuoteRequest) -> Result<i64, QuoteRequestError> {
        let reference = quote_request
            .reference()
            .ok_or(RepositoryError::MissingField { field: "quote_request.quote_request_reference" })?
            .to_owned();
        if quote_request.status.is_none() {
            return Err(RepositoryError::MissingField { field: "quote_request.status" }.into());
        }
        quote_request
            .require_company_user()?
            .require_id("quote_request.company_user.id_company_user")?;
        if self.find(&reference, None).is_some() {
            return Err(RepositoryError::Conflict { reference }.into());
        }

        self.next_id += 1;
        let id = self.next_id;
        self.quote_requests.insert(
            id,
            QuoteRequest {
                id_quote_request: Some(id),
                state_version: 1,
                latest_version: None,
                ..quote_request
            },
        );
        self.versions.insert(id, Vec::new());
        Ok(id)
    }

    fn update(&mut self, quote_request: &QuoteRequest) -> Result<i64, QuoteRequestError> {
        let id = quote_request
            .id_quote_request
            .ok_or(RepositoryError::MissingField { field: "quote_request.id_quote_request" })?;
        let stored = self
            .quote_requests
            .get_mut(&id)
            .filter(|stored| stored.state_version == quote_request.state_version)
            .ok_or_else(|| RepositoryError::Conflict {
                reference: quote_request
                    .reference()
                    .map_or_else(|| id.to_string(), str::to_owned),
            })?;

        // Identity and ownership are fixed at creation.
        stored.status = quote_request.status;
        stored.valid_until = quote_request.valid_until;
        stored.is_latest_version_hidden = quote_request.is_latest_version_hidden;
        stored.state_version += 1;
        Ok(id)
    }

    fn push_version(
        &mut self,
        id_quote_request: i64,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequestVersion, QuoteRequestError> {
        let duplicate = self.versions.values().flatten().any(|stored| {
            version.version_reference.is_some()
                && stored.version_reference == version.version_reference
        });
        if duplicate {
            return Err(RepositoryError::Conflict {
                reference: version.version_reference.clone().unwrap_or_default(),
            }
            .into());
        }

        self.next_version_id += 1;
        let version =
            QuoteRequestVersion { id_quote_request_version: Some(self.next_version_id), ..version };
        self.versions
            .get_mut(&id_quote_request)
            .ok_or_else(|| RepositoryError::Decode(format!("no quote request {id_quote_request}")))?
            .push(version.clone());
        Ok(version)
    }
}

/// Process-local store with the same contract as the sqlite one: unique
/// references, `state_version` checks and latest-version assembly.
#[derive(Default)]
pub struct InMemoryQuoteRequestStore {
    tables: RwLock<Tables>,
}

impl InMemoryQuoteRequestStore {
    pub async fn list_versions(&self, id_quote_request: i64) -> Vec<QuoteRequestVersion> {
        let tables = self.tables.read().await;
        tables.versions.get(&id_quote_request).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl QuoteRequestRepository for InMemoryQuoteRequestStore {
    async fn find_by_reference(
        &self,
        reference: &str,
        company_user: Option<&CompanyUserId>,
    ) -> Result<Option<QuoteRequest>, QuoteRequestError> {
        let tables = self.tables.read().await;
        Ok(tables.find(reference, company_user).and_then(|id| tables.assemble(id)))
    }

    async fn find_by_criteria(
        &self,
        criteria: &QuoteRequestCriteria,
    ) -> Result<Option<QuoteRequest>, QuoteRequestError> {
        let Some(reference) = criteria.reference() else {
            return Ok(None);
        };
        self.find_by_reference(reference, criteria.id_company_user.as_ref()).await
    }
}

#[async_trait]
impl QuoteRequestEntityManager for InMemoryQuoteRequestStore {
    async fn create_quote_request(
        &self,
        quote_request: QuoteRequest,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        let mut tables = self.tables.write().await;
        let id = tables.insert(quote_request)?;
        tables.assemble(id).ok_or_else(|| Tables::lost(id))
    }

    async fn update_quote_request(
        &self,
        quote_request: QuoteRequest,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        let mut tables = self.tables.write().await;
        let id = tables.update(&quote_request)?;
        tables.assemble(id).ok_or_else(|| Tables::lost(id))
    }

    async fn create_quote_request_version(
        &self,
        id_quote_request: i64,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequestVersion, QuoteRequestError> {
        self.tables.write().await.push_version(id_quote_request, version)
    }

    async fn update_quote_request_version(
        &self,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequestVersion, QuoteRequestError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .versions
            .values_mut()
            .flatten()
            .find(|stored| {
                stored.id_quote_request_version.is_some()
                    && stored.id_quote_request_version == version.id_quote_request_version
            })
            .ok_or(RepositoryError::MissingField {
                field: "quote_request_version.id_quote_request_version",
            })?;

        stored.metadata = version.metadata;
        Ok(stored.clone())
    }

    async fn create_quote_request_with_version(
        &self,
        quote_request: QuoteRequest,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let id = staged.insert(quote_request)?;
        staged.push_version(id, version)?;
        *tables = staged;
        tables.assemble(id).ok_or_else(|| Tables::lost(id))
    }

    async fn revise_quote_request(
        &self,
        quote_request: QuoteRequest,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let id = staged.update(&quote_request)?;
        staged.push_version(id, version)?;
        *tables = staged;
        tables.assemble(id).ok_or_else(|| Tables::lost(id))
    }
}

#[derive(Default)]
pub struct InMemorySequenceNumberGenerator {
    counters: Mutex<HashMap<String, i64>>,
}

#[async_trait]
impl SequenceNumberGenerator for InMemorySequenceNumberGenerator {
    async fn generate(&self, settings: &SequenceNumberSettings) -> Result<String, QuoteRequestError> {
        let mut counters = self.counters.lock().await;
        let value = counters.entry(settings.name.clone()).or_insert(0);
        *value += 1;
        Ok(format_sequence(settings, *value))
    }
}
