//! Order timeout rules.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTimeouts {
    /// Unpaid orders older than this are cancelled by the system.
    pub unpaid_timeout: Duration,
    /// Shipped orders older than this are confirmed by the system.
    pub unconfirmed_timeout: Duration,
    /// How often the timeout processor scans.
    pub check_interval: Duration,
}

impl Default for OrderTimeouts {
    fn default() -> Self {
        Self {
            unpaid_timeout: Duration::from_secs(30 * 60),
            unconfirmed_timeout: Duration::from_secs(7 * 24 * 60 * 60),
            check_interval: Duration::from_secs(60),
        }
    }
}
