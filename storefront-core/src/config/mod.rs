//! Runtime configuration types.
//!
//! These are the validated forms of the configuration file. Loading and
//! parsing the file is handled by the server crate.

mod auth;
mod config_store;
mod mall;
mod payment;
mod server;
mod timeouts;

pub use auth::AuthConfig;
pub use config_store::{ConfigStore, ConfigWatcher};
pub use mall::MallConfig;
pub use payment::{AlipayConfig, WechatConfig};
pub use server::ServerConfig;
pub use timeouts::OrderTimeouts;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration state with separate locks for each section.
#[derive(Clone)]
pub struct SharedConfig {
    pub server: Arc<RwLock<ServerConfig>>,
    /// User token verification.
    pub auth: Arc<RwLock<AuthConfig>>,
    /// Checkout rules (freight, submit lock).
    pub mall: Arc<RwLock<MallConfig>>,
    pub wechat: Arc<RwLock<WechatConfig>>,
    pub alipay: Arc<RwLock<AlipayConfig>>,
    /// Timeout rules, watched by the order timeout processor.
    pub timeouts: ConfigStore<OrderTimeouts>,
}
