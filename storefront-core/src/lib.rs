#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod entities;
pub mod events;
pub mod framework;
pub mod lock;
pub mod order;
pub mod payment;
pub mod processors;
pub mod services;

#[cfg(test)]
pub(crate) mod test_fixtures;
