use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::quote::Quote;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequestVersionMetadata {
    pub purchase_order_number: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub note: Option<String>,
}

/// One proposal within a negotiation. Versions are appended, never edited:
/// a revision always produces a new value with the next `version` number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequestVersion {
    pub id_quote_request_version: Option<i64>,
    pub version: u32,
    pub version_reference: Option<String>,
    pub quote: Option<Quote>,
    pub metadata: Option<QuoteRequestVersionMetadata>,
}

impl QuoteRequestVersion {
    pub fn with_quote(quote: Quote) -> Self {
        Self { quote: Some(quote), ..Self::default() }
    }

    /// Builds the version that follows `previous`, carrying `quote` as its
    /// snapshot. Identity fields are left for the writer and storage to assign.
    pub fn next_after(previous: Option<&QuoteRequestVersion>, quote: Quote) -> Self {
        Self {
            id_quote_request_version: None,
            version: previous.map_or(1, |version| version.version + 1),
            version_reference: None,
            quote: Some(quote),
            metadata: previous.and_then(|version| version.metadata.clone()),
        }
    }

    pub fn has_non_empty_quote(&self) -> bool {
        self.quote.as_ref().is_some_and(Quote::has_items)
    }
}
