//! Order events.
//!
//! Services emit an [`OrderEvent`] after a state change commits; the
//! `AdminNotifier` processor consumes them. Events carry identifiers only and
//! processors re-read the order from the database.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, EventSenders, OrderEventReceiver, OrderEventSender, order_event_channel,
};
pub use types::OrderEvent;
