use super::types::OrderEvent;
use tokio::sync::mpsc;

/// Buffer size of event channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

pub type OrderEventSender = mpsc::Sender<OrderEvent>;
pub type OrderEventReceiver = mpsc::Receiver<OrderEvent>;

pub fn order_event_channel() -> (OrderEventSender, OrderEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Senders handed to components that emit events.
#[derive(Clone)]
pub struct EventSenders {
    pub order_event: OrderEventSender,
}

impl EventSenders {
    pub fn new(order_event: OrderEventSender) -> Self {
        Self { order_event }
    }

    /// Emit an order event. A closed channel is logged and otherwise ignored,
    /// since the state change it reports has already been committed.
    pub async fn emit(&self, event: OrderEvent) {
        if let Err(e) = self.order_event.send(event).await {
            tracing::warn!(event = ?e.0, "Order event channel closed, event dropped");
        }
    }
}
