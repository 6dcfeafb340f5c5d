use std::sync::Arc;

use crate::domain::quote::Quote;
use crate::errors::QuoteRequestError;
use crate::ports::{Calculation, CartFacade};

/// Prepares quote snapshots before they are frozen into a version.
#[derive(Clone)]
pub struct QuoteRequestVersionSanitizer {
    cart: Arc<dyn CartFacade>,
    calculation: Arc<dyn Calculation>,
}

impl QuoteRequestVersionSanitizer {
    pub fn new(cart: Arc<dyn CartFacade>, calculation: Arc<dyn Calculation>) -> Self {
        Self { cart, calculation }
    }

    /// Drops everything that belongs to a previous checkout or negotiation
    /// round so the snapshot only carries what the customer asked for.
    pub fn clean_up_quote(&self, mut quote: Quote) -> Quote {
        quote.name = None;
        quote.quote_request_reference = None;
        quote.quote_request_version_reference = None;
        quote.is_locked = false;
        quote.totals = None;
        quote
    }

    pub async fn reload_items(&self, quote: Quote) -> Result<Quote, QuoteRequestError> {
        self.cart.reload_items(quote).await
    }

    pub async fn recalculate(&self, quote: Quote) -> Result<Quote, QuoteRequestError> {
        self.calculation.recalculate(quote).await
    }
}
