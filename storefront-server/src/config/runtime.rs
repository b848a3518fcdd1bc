//! Runtime configuration types.
//!
//! The validated forms live in `storefront-core` so background processors can
//! read them; this module re-exports them for the server.

pub use storefront_core::config::{
    AlipayConfig, AuthConfig, ConfigStore, MallConfig, OrderTimeouts, ServerConfig, SharedConfig,
    WechatConfig,
};
