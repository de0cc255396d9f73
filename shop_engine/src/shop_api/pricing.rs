use crate::db_types::{Cents, LineItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceBreakdown {
    pub items_price: Cents,
    pub tax_price: Cents,
    pub shipping_price: Cents,
    pub total_price: Cents,
}

/// Derives the money fields of a new order from its line items.
///
/// The result is stored on the order at creation time and never recalculated.
pub trait PricingPolicy: Send + Sync {
    fn price(&self, items: &[LineItem]) -> PriceBreakdown;
}

/// A flat tax rate on the item subtotal, plus flat-rate shipping that is waived above a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardPricing {
    /// Tax rate in basis points. 1000 is 10%.
    pub tax_rate_bps: i64,
    /// Orders whose item subtotal is strictly greater than this ship for free.
    pub free_shipping_threshold: Cents,
    pub flat_shipping: Cents,
}

impl Default for StandardPricing {
    fn default() -> Self {
        Self { tax_rate_bps: 1000, free_shipping_threshold: Cents::from_dollars(100), flat_shipping: Cents::from(1000) }
    }
}

impl PricingPolicy for StandardPricing {
    fn price(&self, items: &[LineItem]) -> PriceBreakdown {
        let items_price: Cents = items.iter().map(LineItem::line_total).sum();
        let tax_price = items_price.basis_points(self.tax_rate_bps);
        let shipping_price =
            if items_price > self.free_shipping_threshold { Cents::default() } else { self.flat_shipping };
        let total_price = items_price + tax_price + shipping_price;
        PriceBreakdown { items_price, tax_price, shipping_price, total_price }
    }
}
