//! Admin notification payloads.

use serde::{Deserialize, Serialize};

/// Body POSTed to the configured admin notify URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminNotice {
    pub event_type: String,
    pub order_id: i64,
    pub order_sn: String,
    pub actual_price: String,
    pub timestamp: i64,
}

pub const EVENT_ORDER_PAID: &str = "order_paid";
pub const EVENT_REFUND_REQUESTED: &str = "refund_requested";
