use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use quote_request_core::audit::{AuditOutcome, InMemoryAuditSink};
use quote_request_core::config::AppConfig;
use quote_request_core::domain::quote::{Quote, QuoteItem, QuoteTotals};
use quote_request_core::domain::quote_request::{
    CompanyUser, QuoteRequest, QuoteRequestCriteria, QuoteRequestFilter,
};
use quote_request_core::domain::status::QuoteRequestStatus;
use quote_request_core::errors::QuoteRequestError;
use quote_request_core::ports::{
    Calculation, CartClient, CartFacade, EmbeddedCustomerReferenceResolver, FixedClock,
};
use quote_request_core::response::{QuoteResponse, MESSAGE_QUOTE_REQUEST_WRONG_STATUS};
use quote_request_db::{bootstrap_with_config, HostServices, QuoteRequestApplication};

struct PassthroughCart;

#[async_trait]
impl CartFacade for PassthroughCart {
    async fn reload_items(&self, quote: Quote) -> Result<Quote, QuoteRequestError> {
        Ok(quote)
    }
}

#[async_trait]
impl CartClient for PassthroughCart {
    async fn lock_quote(&self, mut quote: Quote) -> Result<Quote, QuoteRequestError> {
        quote.is_locked = true;
        Ok(quote)
    }

    async fn persist_customer_quote(&self, quote: Quote) -> Result<QuoteResponse, QuoteRequestError> {
        Ok(QuoteResponse::success(quote))
    }
}

struct SummingCalculation;

#[async_trait]
impl Calculation for SummingCalculation {
    async fn recalculate(&self, mut quote: Quote) -> Result<Quote, QuoteRequestError> {
        let subtotal = quote
            .items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum::<Decimal>();
        quote.totals = Some(QuoteTotals { subtotal, tax_total: Decimal::ZERO, grand_total: subtotal });
        Ok(quote)
    }
}

async fn application(audit: InMemoryAuditSink) -> QuoteRequestApplication {
    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".to_owned();
    config.database.max_connections = 1;

    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid timestamp");
    let cart = Arc::new(PassthroughCart);
    let services = HostServices::new(
        cart.clone(),
        cart,
        Arc::new(SummingCalculation),
        Arc::new(EmbeddedCustomerReferenceResolver),
        Arc::new(audit),
    )
    .with_clock(Arc::new(FixedClock(now)));

    bootstrap_with_config(config, services).await.expect("bootstrap")
}

fn company_user() -> CompanyUser {
    CompanyUser::new("42").with_customer_reference("DE--42")
}

fn cart_quote() -> Quote {
    Quote { currency: "EUR".to_owned(), ..Quote::default() }
        .with_items(vec![QuoteItem::new("sku-7", 10, Decimal::new(999, 2))])
}

#[tokio::test]
async fn negotiation_runs_from_request_to_locked_quote() {
    let audit = InMemoryAuditSink::default();
    let app = application(audit.clone()).await;

    let created = app
        .customer_writer
        .create_from_quote(company_user(), cart_quote())
        .await
        .expect("create");
    assert!(created.is_success);
    let reference = created
        .quote_request
        .and_then(|quote_request| quote_request.quote_request_reference)
        .expect("reference");
    assert_eq!(reference, "DE--42-1");
    let criteria = QuoteRequestCriteria::by_reference(reference.clone());

    let revised = app.agent_writer.revise_quote_request(&criteria).await.expect("revise");
    assert!(revised.is_success);

    let valid_until = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).single();
    let updated = app
        .agent_writer
        .update_quote_request(QuoteRequest {
            quote_request_reference: Some(reference.clone()),
            valid_until,
            ..QuoteRequest::default()
        })
        .await
        .expect("update");
    assert!(updated.is_success);

    let sent = app.agent_writer.send_quote_request_to_customer(&criteria).await.expect("send");
    let offer = sent.quote_request.expect("offer");
    assert_eq!(offer.status, Some(QuoteRequestStatus::Ready));
    assert!(!offer.is_latest_version_hidden);
    assert_eq!(offer.state_version, 4);

    let locked = app.converter.convert_quote_request_to_locked_quote(&offer).await.expect("lock");
    let quote = locked.quote.expect("locked quote");
    assert!(quote.is_locked);
    assert_eq!(quote.name.as_deref(), Some("DE--42-1-2"));

    let versions = app
        .store
        .list_versions(offer.id_quote_request.expect("id"))
        .await
        .expect("versions");
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version_reference.as_deref(), Some("DE--42-1-1"));

    assert!(audit.events().iter().all(|event| event.outcome == AuditOutcome::Success));
}

#[tokio::test]
async fn customer_cannot_cancel_while_agent_is_revising() {
    let app = application(InMemoryAuditSink::default()).await;
    let created = app
        .customer_writer
        .create_from_quote(company_user(), cart_quote())
        .await
        .expect("create");
    let reference = created
        .quote_request
        .and_then(|quote_request| quote_request.quote_request_reference)
        .expect("reference");

    app.agent_writer
        .revise_quote_request(&QuoteRequestCriteria::by_reference(reference.clone()))
        .await
        .expect("revise");
    let rejected = app
        .customer_writer
        .cancel_by_reference(&QuoteRequestFilter::new(reference.clone(), company_user()))
        .await
        .expect("cancel");

    assert!(!rejected.is_success);
    assert_eq!(rejected.errors, vec![MESSAGE_QUOTE_REQUEST_WRONG_STATUS.to_owned()]);

    let canceled = app
        .agent_writer
        .cancel_quote_request(&QuoteRequestCriteria::by_reference(reference))
        .await
        .expect("agent cancel");
    assert_eq!(
        canceled.quote_request.and_then(|quote_request| quote_request.status),
        Some(QuoteRequestStatus::Canceled)
    );
}

#[tokio::test]
async fn agent_drafts_get_their_own_reference_sequence_per_customer() {
    let app = application(InMemoryAuditSink::default()).await;

    let first = app
        .agent_writer
        .create_quote_request(QuoteRequest::for_company_user(company_user()))
        .await
        .expect("first");
    let second = app
        .agent_writer
        .create_quote_request(QuoteRequest::for_company_user(company_user()))
        .await
        .expect("second");
    let other = app
        .agent_writer
        .create_quote_request(QuoteRequest::for_company_user(
            CompanyUser::new("7").with_customer_reference("AT--7"),
        ))
        .await
        .expect("other");

    let reference = |response: quote_request_core::response::QuoteRequestResponse| {
        response.quote_request.and_then(|quote_request| quote_request.quote_request_reference)
    };
    assert_eq!(reference(first).as_deref(), Some("DE--42-1"));
    assert_eq!(reference(second).as_deref(), Some("DE--42-2"));
    assert_eq!(reference(other).as_deref(), Some("AT--7-1"));
}

#[tokio::test]
async fn expired_offer_cannot_be_sent() {
    let app = application(InMemoryAuditSink::default()).await;
    let created = app
        .agent_writer
        .create_quote_request(QuoteRequest::for_company_user(company_user()))
        .await
        .expect("create");
    let reference = created
        .quote_request
        .and_then(|quote_request| quote_request.quote_request_reference)
        .expect("reference");
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid timestamp");

    app.agent_writer
        .update_quote_request(QuoteRequest {
            quote_request_reference: Some(reference.clone()),
            valid_until: Some(now - Duration::hours(1)),
            ..QuoteRequest::default()
        })
        .await
        .expect("update");
    let response = app
        .agent_writer
        .send_quote_request_to_customer(&QuoteRequestCriteria::by_reference(reference))
        .await
        .expect("send");

    assert!(!response.is_success);
    assert_eq!(
        response.errors,
        vec!["quote_request.update.validation.error.wrong_valid_until".to_owned()]
    );
}
