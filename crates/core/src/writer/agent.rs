use crate::audit::AuditCategory;
use crate::domain::quote::Quote;
use crate::domain::quote_request::{QuoteRequest, QuoteRequestCriteria};
use crate::domain::status::QuoteRequestStatus;
use crate::domain::version::QuoteRequestVersion;
use crate::errors::QuoteRequestError;
use crate::response::{
    QuoteRequestResponse, MESSAGE_QUOTE_REQUEST_COMPANY_USER_NOT_FOUND,
    MESSAGE_QUOTE_REQUEST_WRONG_VALID_UNTIL,
};
use crate::status_policy::StatusPolicy;
use crate::writer::{Decision, WriterCollaborators};

const ACTOR: &str = "agent";

/// Sales-side actions. Agents see every request by reference; a company user
/// id in the criteria only narrows the lookup.
#[derive(Clone, Debug)]
pub struct UserQuoteRequestWriter {
    collaborators: WriterCollaborators,
    policy: StatusPolicy,
    default_currency: String,
}

impl UserQuoteRequestWriter {
    pub fn new(
        collaborators: WriterCollaborators,
        policy: StatusPolicy,
        default_currency: impl Into<String>,
    ) -> Self {
        Self { collaborators, policy, default_currency: default_currency.into() }
    }

    fn decision<'a>(event_type: &'static str, reference: Option<&'a str>) -> Decision<'a> {
        Decision { event_type, category: AuditCategory::Agent, actor: ACTOR, reference }
    }

    /// Loads the aggregate named by `criteria`, or returns the response the
    /// caller should hand back when that is not possible.
    async fn load(
        &self,
        criteria: &QuoteRequestCriteria,
        event_type: &'static str,
    ) -> Result<Result<QuoteRequest, QuoteRequestResponse>, QuoteRequestError> {
        let Some(reference) = criteria.reference() else {
            return Ok(Err(self.collaborators.record(
                Self::decision(event_type, None),
                None,
                QuoteRequestResponse::failure(),
            )));
        };

        match self.collaborators.repository.find_by_criteria(criteria).await? {
            Some(quote_request) => Ok(Ok(quote_request)),
            None => Ok(Err(self.collaborators.record(
                Self::decision(event_type, Some(reference)),
                None,
                QuoteRequestResponse::not_exists(),
            ))),
        }
    }

    fn reject(
        &self,
        event_type: &'static str,
        quote_request: &QuoteRequest,
        response: QuoteRequestResponse,
    ) -> QuoteRequestResponse {
        self.collaborators.record(
            Self::decision(event_type, quote_request.reference()),
            quote_request.status,
            response,
        )
    }

    /// Opens a request on behalf of a company user. The draft stays hidden
    /// from the customer until it is sent.
    pub async fn create_quote_request(
        &self,
        quote_request: QuoteRequest,
    ) -> Result<QuoteRequestResponse, QuoteRequestError> {
        let company_user = quote_request.require_company_user()?.clone();
        company_user.require_id("quote_request.company_user.id_company_user")?;
        let decision = Self::decision("quote_request.user_create", None);

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

        let version = QuoteRequestVersion::next_after(
            None,
            Quote::for_customer(customer_reference.as_str(), self.default_currency.as_str()),
        );
        let reference = self
            .collaborators
            .references
            .generate_quote_request_reference(&customer_reference)
            .await?;
        let root = QuoteRequest {
            id_quote_request: None,
            quote_request_reference: Some(reference),
            status: Some(QuoteRequestStatus::InProgress),
            company_user: Some(company_user),
            is_latest_version_hidden: true,
            state_version: 0,
            latest_version: None,
            ..quote_request
        };

        let created = self.collaborators.persist_new(decision, root, version).await?;
        Ok(self.collaborators.record(decision, None, QuoteRequestResponse::success(created)))
    }

    pub async fn cancel_quote_request(
        &self,
        criteria: &QuoteRequestCriteria,
    ) -> Result<QuoteRequestResponse, QuoteRequestError> {
        const EVENT: &str = "quote_request.user_cancel";
        let quote_request = match self.load(criteria, EVENT).await? {
            Ok(quote_request) => quote_request,
            Err(response) => return Ok(response),
        };

        let from = quote_request.status;
        if !self.policy.is_cancelable_by_agent(from) {
            return Ok(self.reject(EVENT, &quote_request, QuoteRequestResponse::wrong_status()));
        }

        let reference = quote_request.quote_request_reference.clone();
        let canceled = self
            .collaborators
            .persist_root(
                Self::decision(EVENT, reference.as_deref()),
                from,
                quote_request.with_status(QuoteRequestStatus::Canceled),
            )
            .await?;
        Ok(self.collaborators.record(
            Self::decision(EVENT, None),
            from,
            QuoteRequestResponse::success(canceled),
        ))
    }

    /// Starts a new negotiation round: the latest quote is copied into a new
    /// hidden version with refreshed items and totals. Earlier versions are
    /// left as they were.
    pub async fn revise_quote_request(
        &self,
        criteria: &QuoteRequestCriteria,
    ) -> Result<QuoteRequestResponse, QuoteRequestError> {
        const EVENT: &str = "quote_request.user_revise";
        let quote_request = match self.load(criteria, EVENT).await? {
            Ok(quote_request) => quote_request,
            Err(response) => return Ok(response),
        };

        let from = quote_request.status;
        if !self.policy.is_revisable_by_agent(from) {
            return Ok(self.reject(EVENT, &quote_request, QuoteRequestResponse::wrong_status()));
        }

        let reference = quote_request.quote_request_reference.clone();
        let decision = Self::decision(EVENT, reference.as_deref());
        let previous = quote_request.latest_version.clone();
        let sanitizer = &self.collaborators.sanitizer;
        let quote = previous
            .as_ref()
            .and_then(|version| version.quote.clone())
            .unwrap_or_default();
        let fail = |error: QuoteRequestError| self.collaborators.fail(decision, from, error);
        let quote = sanitizer.reload_items(quote).await.map_err(fail)?;
        let quote = sanitizer.recalculate(quote).await.map_err(fail)?;

        let mut version = QuoteRequestVersion::next_after(previous.as_ref(), quote);
        version.version_reference =
            Some(self.collaborators.references.generate_version_reference(&quote_request, &version)?);

        let revised = self
            .collaborators
            .persist_revision(
                decision,
                from,
                QuoteRequest {
                    status: Some(QuoteRequestStatus::InProgress),
                    is_latest_version_hidden: true,
                    ..quote_request
                },
                version,
            )
            .await?;

        Ok(self.collaborators.record(
            Self::decision(EVENT, None),
            from,
            QuoteRequestResponse::success(revised),
        ))
    }

    /// Publishes the agent's offer. Only an in-progress request with an
    /// expiry strictly in the future can be sent.
    pub async fn send_quote_request_to_customer(
        &self,
        criteria: &QuoteRequestCriteria,
    ) -> Result<QuoteRequestResponse, QuoteRequestError> {
        const EVENT: &str = "quote_request.user_send_to_customer";
        let quote_request = match self.load(criteria, EVENT).await? {
            Ok(quote_request) => quote_request,
            Err(response) => return Ok(response),
        };

        let from = quote_request.status;
        if from != Some(QuoteRequestStatus::InProgress) {
            return Ok(self.reject(EVENT, &quote_request, QuoteRequestResponse::wrong_status()));
        }

        let now = self.collaborators.clock.now();
        if !quote_request.valid_until.is_some_and(|valid_until| valid_until > now) {
            return Ok(self.reject(
                EVENT,
                &quote_request,
                QuoteRequestResponse::error(MESSAGE_QUOTE_REQUEST_WRONG_VALID_UNTIL),
            ));
        }

        let reference = quote_request.quote_request_reference.clone();
        let sent = self
            .collaborators
            .persist_root(
                Self::decision(EVENT, reference.as_deref()),
                from,
                QuoteRequest {
                    status: Some(QuoteRequestStatus::Ready),
                    is_latest_version_hidden: false,
                    ..quote_request
                },
            )
            .await?;
        Ok(self.collaborators.record(
            Self::decision(EVENT, None),
            from,
            QuoteRequestResponse::success(sent),
        ))
    }

    /// Edits root fields of a request the agent is working on. Only
    /// `valid_until` is taken from the input.
    pub async fn update_quote_request(
        &self,
        quote_request: QuoteRequest,
    ) -> Result<QuoteRequestResponse, QuoteRequestError> {
        const EVENT: &str = "quote_request.user_update";
        let criteria = QuoteRequestCriteria {
            quote_request_reference: quote_request.quote_request_reference.clone(),
            id_company_user: None,
        };
        let stored = match self.load(&criteria, EVENT).await? {
            Ok(stored) => stored,
            Err(response) => return Ok(response),
        };

        let from = stored.status;
        if from != Some(QuoteRequestStatus::InProgress) {
            return Ok(self.reject(EVENT, &stored, QuoteRequestResponse::wrong_status()));
        }

        let reference = stored.quote_request_reference.clone();
        let updated = self
            .collaborators
            .persist_root(
                Self::decision(EVENT, reference.as_deref()),
                from,
                stored.with_valid_until(quote_request.valid_until),
            )
            .await?;
        Ok(self.collaborators.record(
            Self::decision(EVENT, None),
            from,
            QuoteRequestResponse::success(updated),
        ))
    }
}
