use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub sum_price: Option<Decimal>,
}

impl QuoteItem {
    pub fn new(sku: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        Self { sku: sku.into(), quantity, unit_price, sum_price: None }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub grand_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub method_name: String,
    pub price: Decimal,
}

/// Cart-quote snapshot owned by a quote request version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub name: Option<String>,
    pub customer_reference: Option<String>,
    pub currency: String,
    pub items: Vec<QuoteItem>,
    pub shipment: Option<Shipment>,
    pub totals: Option<QuoteTotals>,
    pub quote_request_reference: Option<String>,
    pub quote_request_version_reference: Option<String>,
    pub is_locked: bool,
}

impl Quote {
    pub fn for_customer(customer_reference: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            customer_reference: Some(customer_reference.into()),
            currency: currency.into(),
            ..Self::default()
        }
    }

    pub fn with_items(mut self, items: Vec<QuoteItem>) -> Self {
        self.items = items;
        self
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }
}
