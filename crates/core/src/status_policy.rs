use crate::config::QuoteRequestConfig;
use crate::domain::status::QuoteRequestStatus;

/// Which statuses allow which actor to act. Every gate is a membership test
/// against the configured sets so deployments can widen or narrow the
/// lifecycle without code changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusPolicy {
    initial_status: QuoteRequestStatus,
    cancelable_by_customer: Vec<QuoteRequestStatus>,
    cancelable_by_agent: Vec<QuoteRequestStatus>,
    revisable_by_agent: Vec<QuoteRequestStatus>,
}

impl StatusPolicy {
    pub fn new(
        initial_status: QuoteRequestStatus,
        cancelable_by_customer: Vec<QuoteRequestStatus>,
        cancelable_by_agent: Vec<QuoteRequestStatus>,
        revisable_by_agent: Vec<QuoteRequestStatus>,
    ) -> Self {
        Self { initial_status, cancelable_by_customer, cancelable_by_agent, revisable_by_agent }
    }

    pub fn from_config(config: &QuoteRequestConfig) -> Self {
        Self::new(
            config.initial_status,
            config.cancelable_statuses.clone(),
            config.user_cancelable_statuses.clone(),
            config.user_revisable_statuses.clone(),
        )
    }

    pub fn initial_status(&self) -> QuoteRequestStatus {
        self.initial_status
    }

    pub fn is_cancelable_by_customer(&self, status: Option<QuoteRequestStatus>) -> bool {
        contains(&self.cancelable_by_customer, status)
    }

    pub fn is_cancelable_by_agent(&self, status: Option<QuoteRequestStatus>) -> bool {
        contains(&self.cancelable_by_agent, status)
    }

    pub fn is_revisable_by_agent(&self, status: Option<QuoteRequestStatus>) -> bool {
        contains(&self.revisable_by_agent, status)
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::from_config(&QuoteRequestConfig::default())
    }
}

fn contains(set: &[QuoteRequestStatus], status: Option<QuoteRequestStatus>) -> bool {
    status.is_some_and(|status| set.contains(&status))
}
