//! Business operations behind the order API.

pub mod error;
pub mod groupon;
pub mod order;

pub use error::{BusinessError, ServiceError, ServiceResult};
pub use order::{OrderServices, PaymentOutcome};
