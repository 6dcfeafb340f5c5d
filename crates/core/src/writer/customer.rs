use crate::audit::AuditCategory;
use crate::domain::quote::Quote;
use crate::domain::quote_request::{CompanyUser, QuoteRequest, QuoteRequestFilter};
use crate::domain::status::QuoteRequestStatus;
use crate::domain::version::QuoteRequestVersion;
use crate::errors::QuoteRequestError;
use crate::response::{QuoteRequestResponse, MESSAGE_QUOTE_REQUEST_COMPANY_USER_NOT_FOUND};
use crate::status_policy::StatusPolicy;
use crate::writer::{Decision, WriterCollaborators};

const ACTOR: &str = "customer";

/// Actions initiated by the company user who owns the request.
#[derive(Clone, Debug)]
pub struct QuoteRequestWriter {
    collaborators: WriterCollaborators,
    policy: StatusPolicy,
}

impl QuoteRequestWriter {
    pub fn new(collaborators: WriterCollaborators, policy: StatusPolicy) -> Self {
        Self { collaborators, policy }
    }

    /// Submits a new request. The caller's status is ignored; every customer
    /// request starts in the configured initial status.
    pub async fn create(
        &self,
        quote_request: QuoteRequest,
    ) -> Result<QuoteRequestResponse, QuoteRequestError> {
        let company_user = quote_request.require_company_user()?.clone();
        let version = quote_request
            .latest_version
            .clone()
            .filter(QuoteRequestVersion::has_non_empty_quote)
            .ok_or(QuoteRequestError::RequiredField { field: "quote_request.latest_version.quote" })?;

        let decision = Decision {
            event_type: "quote_request.create",
            category: AuditCategory::Customer,
            actor: ACTOR,
            reference: None,
        };

        let Some(customer_reference) = self
            .collaborators
            .company_user_resolver
            .resolve_customer_reference(&company_user)
            .await?
        else {
            return Ok(self.collaborators.record(
                decision,
                None,
                QuoteRequestResponse::error(MESSAGE_QUOTE_REQUEST_COMPANY_USER_NOT_FOUND),
            ));
        };

        let sanitizer = &self.collaborators.sanitizer;
        let mut quote = sanitizer.clean_up_quote(version.quote.clone().unwrap_or_default());
        if quote.customer_reference.is_none() {
            quote.customer_reference = Some(customer_reference.clone());
        }
        let quote = sanitizer.recalculate(quote).await?;

        let reference = self
            .collaborators
            .references
            .generate_quote_request_reference(&customer_reference)
            .await?;
        let root = QuoteRequest {
            id_quote_request: None,
            quote_request_reference: Some(reference),
            status: Some(self.policy.initial_status()),
            company_user: Some(company_user),
            is_latest_version_hidden: false,
            state_version: 0,
            latest_version: None,
            ..quote_request
        };
        let first_version = QuoteRequestVersion {
            id_quote_request_version: None,
            version: 1,
            version_reference: None,
            quote: Some(quote),
            metadata: version.metadata,
        };

        let created = self.collaborators.persist_new(decision, root, first_version).await?;
        Ok(self.collaborators.record(decision, None, QuoteRequestResponse::success(created)))
    }

    /// Wraps a cart quote into a new request for `company_user`.
    pub async fn create_from_quote(
        &self,
        company_user: CompanyUser,
        quote: Quote,
    ) -> Result<QuoteRequestResponse, QuoteRequestError> {
        self.create(
            QuoteRequest::for_company_user(company_user)
                .with_latest_version(QuoteRequestVersion::with_quote(quote)),
        )
        .await
    }

    pub async fn cancel_by_reference(
        &self,
        filter: &QuoteRequestFilter,
    ) -> Result<QuoteRequestResponse, QuoteRequestError> {
        let reference = filter
            .quote_request_reference
            .as_deref()
            .filter(|reference| !reference.trim().is_empty())
            .ok_or(QuoteRequestError::RequiredField {
                field: "quote_request_filter.quote_request_reference",
            })?;
        let company_user = filter.company_user.as_ref().ok_or(QuoteRequestError::RequiredField {
            field: "quote_request_filter.company_user",
        })?;
        let id_company_user =
            company_user.require_id("quote_request_filter.company_user.id_company_user")?;

        let decision = Decision {
            event_type: "quote_request.cancel",
            category: AuditCategory::Customer,
            actor: ACTOR,
            reference: Some(reference),
        };

        let Some(quote_request) = self
            .collaborators
            .repository
            .find_by_reference(reference, Some(id_company_user))
            .await?
        else {
            return Ok(self.collaborators.record(decision, None, QuoteRequestResponse::not_exists()));
        };

        let from = quote_request.status;
        if !self.policy.is_cancelable_by_customer(from) {
            return Ok(self.collaborators.record(decision, from, QuoteRequestResponse::wrong_status()));
        }

        let canceled = self
            .collaborators
            .persist_root(decision, from, quote_request.with_status(QuoteRequestStatus::Canceled))
            .await?;
        Ok(self.collaborators.record(decision, from, QuoteRequestResponse::success(canceled)))
    }
}
