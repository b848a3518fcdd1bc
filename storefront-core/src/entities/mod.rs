//! Database rows and the queries that read and write them.
//!
//! Single-statement reads are `kanau` processors on
//! [`DatabaseProcessor`](crate::framework::DatabaseProcessor). Statements that
//! belong to a larger unit of work are associated functions taking the open
//! transaction.

pub mod address;
pub mod cart;
pub mod coupon;
pub mod groupon;
pub mod order;
pub mod order_goods;
pub mod product;
