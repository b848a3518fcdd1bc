//! Background processors.
//!
//! - `AdminNotifier`: receives `OrderEvent`, POSTs notices to the admin URL
//! - `OrderTimeoutWatcher`: cancels unpaid and confirms unreceived orders

pub mod admin_notifier;
pub mod order_timeout;

pub use admin_notifier::AdminNotifier;
pub use order_timeout::OrderTimeoutWatcher;
