use storefront_sdk::objects::notify::{EVENT_ORDER_PAID, EVENT_REFUND_REQUESTED};

/// Something an administrator should hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    /// A payment was reconciled.
    Paid { order_id: i64 },
    /// The user asked for a refund of a paid order.
    RefundRequested { order_id: i64 },
}

impl OrderEvent {
    pub fn order_id(&self) -> i64 {
        match self {
            OrderEvent::Paid { order_id } | OrderEvent::RefundRequested { order_id } => *order_id,
        }
    }

    /// `event_type` of the admin notice.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Paid { .. } => EVENT_ORDER_PAID,
            OrderEvent::RefundRequested { .. } => EVENT_REFUND_REQUESTED,
        }
    }
}
