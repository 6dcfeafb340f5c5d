use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::status::QuoteRequestStatus;
use crate::domain::version::QuoteRequestVersion;
use crate::errors::QuoteRequestError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyUserId(pub String);

impl CompanyUserId {
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_reference: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyUser {
    pub id_company_user: Option<CompanyUserId>,
    pub customer: Option<Customer>,
}

impl CompanyUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id_company_user: Some(CompanyUserId(id.into())), customer: None }
    }

    pub fn with_customer_reference(mut self, customer_reference: impl Into<String>) -> Self {
        self.customer = Some(Customer { customer_reference: Some(customer_reference.into()) });
        self
    }

    pub fn customer_reference(&self) -> Option<&str> {
        self.customer
            .as_ref()
            .and_then(|customer| customer.customer_reference.as_deref())
            .filter(|reference| !reference.trim().is_empty())
    }

    /// Returns the company user id or the contract failure naming `field`.
    pub fn require_id(&self, field: &'static str) -> Result<&CompanyUserId, QuoteRequestError> {
        self.id_company_user
            .as_ref()
            .filter(|id| !id.is_blank())
            .ok_or(QuoteRequestError::RequiredField { field })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub id_quote_request: Option<i64>,
    pub quote_request_reference: Option<String>,
    pub status: Option<QuoteRequestStatus>,
    pub company_user: Option<CompanyUser>,
    pub valid_until: Option<DateTime<Utc>>,
    pub latest_version: Option<QuoteRequestVersion>,
    pub is_latest_version_hidden: bool,
    pub state_version: u32,
}

impl QuoteRequest {
    pub fn for_company_user(company_user: CompanyUser) -> Self {
        Self { company_user: Some(company_user), ..Self::default() }
    }

    pub fn with_status(mut self, status: QuoteRequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_latest_version(mut self, version: QuoteRequestVersion) -> Self {
        self.latest_version = Some(version);
        self
    }

    pub fn with_valid_until(mut self, valid_until: Option<DateTime<Utc>>) -> Self {
        self.valid_until = valid_until;
        self
    }

    pub fn with_latest_version_hidden(mut self, hidden: bool) -> Self {
        self.is_latest_version_hidden = hidden;
        self
    }

    pub fn has_status(&self, status: QuoteRequestStatus) -> bool {
        self.status == Some(status)
    }

    pub fn reference(&self) -> Option<&str> {
        self.quote_request_reference.as_deref().filter(|reference| !reference.trim().is_empty())
    }

    pub fn require_company_user(&self) -> Result<&CompanyUser, QuoteRequestError> {
        self.company_user
            .as_ref()
            .ok_or(QuoteRequestError::RequiredField { field: "quote_request.company_user" })
    }
}

/// Customer-side lookup: a reference scoped to the acting company user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequestFilter {
    pub quote_request_reference: Option<String>,
    pub company_user: Option<CompanyUser>,
}

impl QuoteRequestFilter {
    pub fn new(reference: impl Into<String>, company_user: CompanyUser) -> Self {
        Self { quote_request_reference: Some(reference.into()), company_user: Some(company_user) }
    }
}

/// Agent-side lookup criteria. `id_company_user` narrows the search when set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequestCriteria {
    pub quote_request_reference: Option<String>,
    pub id_company_user: Option<CompanyUserId>,
}

impl QuoteRequestCriteria {
    pub fn by_reference(reference: impl Into<String>) -> Self {
        Self { quote_request_reference: Some(reference.into()), id_company_user: None }
    }

    pub fn reference(&self) -> Option<&str> {
        self.quote_request_reference.as_deref().filter(|reference| !reference.trim().is_empty())
    }
}
