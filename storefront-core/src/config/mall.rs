//! Checkout rules.

use rust_decimal::Decimal;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MallConfig {
    /// Orders whose goods total is below this pay `freight_value`.
    pub freight_min: Decimal,
    pub freight_value: Decimal,
    /// How long a submit lock is held at most.
    pub submit_lock_ttl: Duration,
    /// Where admin notices are POSTed. Notices are only logged when unset.
    pub notify_url: Option<url::Url>,
}

impl MallConfig {
    /// Freight charged for an order with the given goods total.
    pub fn freight_for(&self, goods_total: Decimal) -> Decimal {
        if goods_total < self.freight_min {
            self.freight_value
        } else {
            Decimal::ZERO
        }
    }
}
