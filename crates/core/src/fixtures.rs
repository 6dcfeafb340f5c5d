//! Fakes shared by the unit tests in this crate.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::quote::{Quote, QuoteItem, QuoteTotals};
use crate::domain::quote_request::{
    CompanyUser, CompanyUserId, QuoteRequest, QuoteRequestCriteria,
};
use crate::domain::status::QuoteRequestStatus;
use crate::domain::version::QuoteRequestVersion;
use crate::errors::QuoteRequestError;
use crate::ports::{
    Calculation, CartClient, CartFacade, QuoteRequestEntityManager, QuoteRequestRepository,
    SequenceNumberGenerator, SequenceNumberSettings,
};
use crate::response::QuoteResponse;

pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid timestamp")
}

pub(crate) fn company_user() -> CompanyUser {
    CompanyUser::new("1").with_customer_reference("DE--1")
}

pub(crate) fn sample_quote() -> Quote {
    Quote {
        currency: "EUR".to_owned(),
        ..Quote::default()
    }
    .with_items(vec![
        QuoteItem::new("sku-1", 2, Decimal::new(1_500, 2)),
        QuoteItem::new("sku-2", 1, Decimal::new(4_000, 2)),
    ])
}

/// Per-name counter that renders `prefix` followed by the next number.
#[derive(Default)]
pub(crate) struct CountingSequence {
    counters: Mutex<HashMap<String, u64>>,
}

#[async_trait]
impl SequenceNumberGenerator for CountingSequence {
    async fn generate(&self, settings: &SequenceNumberSettings) -> Result<String, QuoteRequestError> {
        let mut counters = self.counters.lock().expect("sequence lock");
        let next = counters.entry(settings.name.clone()).or_insert(0);
        *next += 1;
        Ok(format!(
            "{}{:0width$}",
            settings.prefix.as_deref().unwrap_or_default(),
            next,
            width = settings.padding
        ))
    }
}

#[derive(Clone, Default)]
struct StoreState {
    next_id: i64,
    next_version_id: i64,
    roots: BTreeMap<i64, QuoteRequest>,
    versions: BTreeMap<i64, Vec<QuoteRequestVersion>>,
}

/// Repository and entity manager over a single in-process map. Every
/// successful entity-manager call increments `writes`. Composite calls are
/// staged on a copy of the state and applied only when every step succeeds.
#[derive(Default)]
pub(crate) struct FakeQuoteRequestStore {
    state: Mutex<StoreState>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    fail_version_writes: AtomicBool,
}

impl FakeQuoteRequestStore {
    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Makes every version insert fail while root writes keep working.
    pub(crate) fn fail_version_writes(&self) {
        self.fail_version_writes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn try_lookup(&self, reference: &str) -> Option<QuoteRequest> {
        self.find(reference, None)
    }

    pub(crate) fn versions_of(&self, reference: &str) -> Vec<QuoteRequestVersion> {
        let state = self.state.lock().expect("store lock");
        state
            .roots
            .iter()
            .find(|(_, root)| root.quote_request_reference.as_deref() == Some(reference))
            .and_then(|(id, _)| state.versions.get(id).cloned())
            .unwrap_or_default()
    }

    pub(crate) fn lookup(&self, reference: &str) -> QuoteRequest {
        self.find(reference, None).expect("stored quote request")
    }

    /// Stores an aggregate in the given shape without counting it as a write.
    pub(crate) fn seed(&self, quote_request: QuoteRequest) -> QuoteRequest {
        let mut state = self.state.lock().expect("store lock");
        state.next_id += 1;
        let id = state.next_id;
        let mut root = quote_request;
        root.id_quote_request = Some(id);
        root.state_version = 1;

        let mut versions = Vec::new();
        if let Some(mut version) = root.latest_version.take() {
            state.next_version_id += 1;
            version.id_quote_request_version = Some(state.next_version_id);
            versions.push(version);
        }
        state.roots.insert(id, root);
        state.versions.insert(id, versions);
        Self::assemble(&state, id).expect("seeded aggregate")
    }

    fn assemble(state: &StoreState, id: i64) -> Option<QuoteRequest> {
        let mut quote_request = state.roots.get(&id)?.clone();
        quote_request.latest_version =
            state.versions.get(&id).and_then(|versions| versions.last().cloned());
        Some(quote_request)
    }

    fn check_writable(&self) -> Result<(), QuoteRequestError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(QuoteRequestError::Persistence("store is read-only".to_owned()));
        }
        Ok(())
    }

    fn insert_root(
        state: &mut StoreState,
        quote_request: QuoteRequest,
    ) -> Result<i64, QuoteRequestError> {
        if state.roots.values().any(|root| {
            root.quote_request_reference.is_some()
                && root.quote_request_reference == quote_request.quote_request_reference
        }) {
            return Err(QuoteRequestError::Persistence("duplicate reference".to_owned()));
        }

        state.next_id += 1;
        let id = state.next_id;
        let mut root = quote_request;
        root.id_quote_request = Some(id);
        root.state_version = 1;
        root.latest_version = None;
        state.roots.insert(id, root);
        state.versions.insert(id, Vec::new());
        Ok(id)
    }

    fn update_root(
        state: &mut StoreState,
        quote_request: QuoteRequest,
    ) -> Result<i64, QuoteRequestError> {
        let id = quote_request.id_quote_request.ok_or(QuoteRequestError::RequiredField {
            field: "quote_request.id_quote_request",
        })?;
        let stored = state
            .roots
            .get_mut(&id)
            .ok_or_else(|| QuoteRequestError::Persistence(format!("no quote request {id}")))?;
        if stored.state_version != quote_request.state_version {
            return Err(QuoteRequestError::Persistence("stale state version".to_owned()));
        }

        let mut root = quote_request;
        root.state_version += 1;
        root.latest_version = None;
        *stored = root;
        Ok(id)
    }

    fn push_version(
        &self,
        state: &mut StoreState,
        id_quote_request: i64,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequestVersion, QuoteRequestError> {
        if self.fail_version_writes.load(Ordering::SeqCst) {
            return Err(QuoteRequestError::Persistence("disk I/O error".to_owned()));
        }
        state.next_version_id += 1;
        let version = QuoteRequestVersion {
            id_quote_request_version: Some(state.next_version_id),
            ..version
        };
        state
            .versions
            .get_mut(&id_quote_request)
            .ok_or_else(|| {
                QuoteRequestError::Persistence(format!("no quote request {id_quote_request}"))
            })?
            .push(version.clone());
        Ok(version)
    }

    /// Runs `apply` against a copy of the state and keeps the copy only when
    /// it succeeds.
    fn staged(
        &self,
        apply: impl FnOnce(&mut StoreState) -> Result<i64, QuoteRequestError>,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        self.check_writable()?;
        let mut state = self.state.lock().expect("store lock");
        let mut staged = state.clone();
        let id = apply(&mut staged)?;
        *state = staged;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Self::assemble(&state, id).expect("stored aggregate"))
    }

    fn find(
        &self,
        reference: &str,
        company_user: Option<&CompanyUserId>,
    ) -> Option<QuoteRequest> {
        let state = self.state.lock().expect("store lock");
        let id = state.roots.iter().find_map(|(id, root)| {
            let reference_matches = root.quote_request_reference.as_deref() == Some(reference);
            let owner_matches = company_user.map_or(true, |expected| {
                root.company_user
                    .as_ref()
                    .and_then(|owner| owner.id_company_user.as_ref())
                    == Some(expected)
            });
            (reference_matches && owner_matches).then_some(*id)
        })?;
        Self::assemble(&state, id)
    }
}

#[async_trait]
impl QuoteRequestRepository for FakeQuoteRequestStore {
    async fn find_by_reference(
        &self,
        reference: &str,
        company_user: Option<&CompanyUserId>,
    ) -> Result<Option<QuoteRequest>, QuoteRequestError> {
        Ok(self.find(reference, company_user))
    }

    async fn find_by_criteria(
        &self,
        criteria: &QuoteRequestCriteria,
    ) -> Result<Option<QuoteRequest>, QuoteRequestError> {
        Ok(criteria
            .reference()
            .and_then(|reference| self.find(reference, criteria.id_company_user.as_ref())))
    }
}

#[async_trait]
impl QuoteRequestEntityManager for FakeQuoteRequestStore {
    async fn create_quote_request(
        &self,
        quote_request: QuoteRequest,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        self.staged(|state| Self::insert_root(state, quote_request))
    }

    async fn update_quote_request(
        &self,
        quote_request: QuoteRequest,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        self.staged(|state| Self::update_root(state, quote_request))
    }

    async fn create_quote_request_version(
        &self,
        id_quote_request: i64,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequestVersion, QuoteRequestError> {
        self.check_writable()?;
        let mut state = self.state.lock().expect("store lock");
        let version = self.push_version(&mut state, id_quote_request, version)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(version)
    }

    async fn update_quote_request_version(
        &self,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequestVersion, QuoteRequestError> {
        self.check_writable()?;
        let mut state = self.state.lock().expect("store lock");
        let slot = state
            .versions
            .values_mut()
            .flatten()
            .find(|stored| stored.id_quote_request_version == version.id_quote_request_version)
            .ok_or_else(|| QuoteRequestError::Persistence("unknown version".to_owned()))?;
        slot.metadata = version.metadata;
        let updated = slot.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(updated)
    }

    async fn create_quote_request_with_version(
        &self,
        quote_request: QuoteRequest,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        self.staged(|state| {
            let id = Self::insert_root(state, quote_request)?;
            self.push_version(state, id, version)?;
            Ok(id)
        })
    }

    async fn revise_quote_request(
        &self,
        quote_request: QuoteRequest,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        self.staged(|state| {
            let id = Self::update_root(state, quote_request)?;
            self.push_version(state, id, version)?;
            Ok(id)
        })
    }
}

/// Prices every item at `quantity * unit_price` with no tax.
pub(crate) struct StubCalculation;

#[async_trait]
impl Calculation for StubCalculation {
    async fn recalculate(&self, mut quote: Quote) -> Result<Quote, QuoteRequestError> {
        let mut subtotal = Decimal::ZERO;
        for item in &mut quote.items {
            let sum = item.unit_price * Decimal::from(item.quantity);
            item.sum_price = Some(sum);
            subtotal += sum;
        }
        if let Some(shipment) = &quote.shipment {
            subtotal += shipment.price;
        }
        quote.totals = Some(QuoteTotals { subtotal, tax_total: Decimal::ZERO, grand_total: subtotal });
        Ok(quote)
    }
}

#[derive(Default)]
pub(crate) struct StubCart {
    reload_calls: AtomicUsize,
    persisted: Mutex<Vec<Quote>>,
    rejection: Option<String>,
}

impl StubCart {
    pub(crate) fn rejecting(message: impl Into<String>) -> Self {
        Self { rejection: Some(message.into()), ..Self::default() }
    }

    pub(crate) fn reload_calls(&self) -> usize {
        self.reload_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn persisted(&self) -> Vec<Quote> {
        self.persisted.lock().expect("cart lock").clone()
    }
}

#[async_trait]
impl CartFacade for StubCart {
    async fn reload_items(&self, quote: Quote) -> Result<Quote, QuoteRequestError> {
        self.reload_calls.fetch_add(1, Ordering::SeqCst);
        Ok(quote)
    }
}

#[async_trait]
impl CartClient for StubCart {
    async fn lock_quote(&self, mut quote: Quote) -> Result<Quote, QuoteRequestError> {
        quote.is_locked = true;
        Ok(quote)
    }

    async fn persist_customer_quote(&self, quote: Quote) -> Result<QuoteResponse, QuoteRequestError> {
        if let Some(message) = &self.rejection {
            return Ok(QuoteResponse::error(message.clone()));
        }
        self.persisted.lock().expect("cart lock").push(quote.clone());
        Ok(QuoteResponse::success(quote))
    }
}

pub(crate) fn waiting_request(reference: &str) -> QuoteRequest {
    QuoteRequest {
        quote_request_reference: Some(reference.to_owned()),
        ..QuoteRequest::for_company_user(company_user())
    }
    .with_status(QuoteRequestStatus::Waiting)
    .with_latest_version(QuoteRequestVersion {
        version: 1,
        version_reference: Some(format!("{reference}-1")),
        ..QuoteRequestVersion::with_quote(sample_quote())
    })
}

pub(crate) fn shared_store() -> Arc<FakeQuoteRequestStore> {
    Arc::new(FakeQuoteRequestStore::default())
}
