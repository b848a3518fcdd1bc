//! Order domain rules that do not touch the database.

pub mod pricing;
pub mod serial;
pub mod show_type;
pub mod status;

pub use pricing::{CheckoutLine, GrouponDiscount, PriceBreakdown};
pub use serial::generate_order_sn;
pub use show_type::statuses_for_show_type;
pub use status::OrderStatus;
