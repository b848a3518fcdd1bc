//! Configuration module for storefront-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables.

pub mod file;
pub mod runtime;

use crate::config::file::{
    ALIPAY_GATEWAY, AlipayConfig as FileAlipayConfig, FileConfig, MallConfig as FileMallConfig,
    TimeoutsConfig, WECHAT_GATEWAY, WechatConfig as FileWechatConfig,
};
use crate::config::runtime::{
    AlipayConfig, AuthConfig, ConfigStore, MallConfig, OrderTimeouts, ServerConfig, SharedConfig,
    WechatConfig,
};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use storefront_sdk::signature::{check_rsa_private_key, check_rsa_public_key, decode_base64_key};
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub mall: MallConfig,
    pub timeouts: OrderTimeouts,
    pub wechat: WechatConfig,
    pub alipay: AlipayConfig,
}

impl LoadedConfig {
    /// Convert into a SharedConfig with Arc<RwLock<T>> wrappers.
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig {
            server: Arc::new(RwLock::new(self.server)),
            auth: Arc::new(RwLock::new(self.auth)),
            mall: Arc::new(RwLock::new(self.mall)),
            wechat: Arc::new(RwLock::new(self.wechat)),
            alipay: Arc::new(RwLock::new(self.alipay)),
            timeouts: ConfigStore::new(self.timeouts),
        }
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read the TOML file, apply CLI overrides, validate, and build the
    /// runtime configuration.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;
        build_loaded_config(file_config)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.auth.token_secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "auth.token_secret must not be empty".to_string(),
        ));
    }
    if config.auth.token_ttl_secs <= 0 {
        return Err(ConfigError::ValidationError(
            "auth.token_ttl_secs must be positive".to_string(),
        ));
    }
    if config.mall.freight_min < Decimal::ZERO || config.mall.freight_value < Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "mall freight amounts must not be negative".to_string(),
        ));
    }
    if config.mall.submit_lock_ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "mall.submit_lock_ttl_secs must be positive".to_string(),
        ));
    }
    if config.timeouts.check_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "timeouts.check_interval_secs must be positive".to_string(),
        ));
    }
    if config.wechat.api_key.is_empty() || config.wechat.mch_id.is_empty() {
        return Err(ConfigError::ValidationError(
            "wechat.mch_id and wechat.api_key are required".to_string(),
        ));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    Ok(LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        auth: AuthConfig::new(
            file_config.auth.token_secret.into_bytes(),
            file_config.auth.token_ttl_secs,
        ),
        mall: convert_mall(file_config.mall),
        timeouts: convert_timeouts(&file_config.timeouts),
        wechat: convert_wechat(file_config.wechat)?,
        alipay: convert_alipay(file_config.alipay)?,
    })
}

fn convert_mall(m: FileMallConfig) -> MallConfig {
    MallConfig {
        freight_min: m.freight_min,
        freight_value: m.freight_value,
        submit_lock_ttl: Duration::from_secs(m.submit_lock_ttl_secs),
        notify_url: m.notify_url,
    }
}

fn convert_timeouts(t: &TimeoutsConfig) -> OrderTimeouts {
    OrderTimeouts {
        unpaid_timeout: Duration::from_secs(t.unpaid_timeout_minutes * 60),
        unconfirmed_timeout: Duration::from_secs(t.unconfirmed_timeout_days * 24 * 60 * 60),
        check_interval: Duration::from_secs(t.check_interval_secs),
    }
}

fn gateway_or_default(gateway: Option<Url>, default: &str) -> Result<Url, ConfigError> {
    match gateway {
        Some(url) => Ok(url),
        None => Url::parse(default)
            .map_err(|e| ConfigError::ValidationError(format!("bad default gateway: {e}"))),
    }
}

fn convert_wechat(w: FileWechatConfig) -> Result<WechatConfig, ConfigError> {
    Ok(WechatConfig {
        gateway: gateway_or_default(w.gateway, WECHAT_GATEWAY)?,
        app_id: w.app_id,
        mch_id: w.mch_id,
        api_key: w.api_key,
        notify_url: w.notify_url,
        client_ip: w.client_ip,
    })
}

fn convert_alipay(a: FileAlipayConfig) -> Result<AlipayConfig, ConfigError> {
    let private_key = decode_base64_key(&a.private_key).map_err(|e| {
        ConfigError::ValidationError(format!("alipay.private_key: {e}"))
    })?;
    check_rsa_private_key(&private_key)
        .map_err(|e| ConfigError::ValidationError(format!("alipay.private_key: {e}")))?;

    let public_key = decode_base64_key(&a.alipay_public_key).map_err(|e| {
        ConfigError::ValidationError(format!("alipay.alipay_public_key: {e}"))
    })?;
    check_rsa_public_key(&public_key)
        .map_err(|e| ConfigError::ValidationError(format!("alipay.alipay_public_key: {e}")))?;

    Ok(AlipayConfig {
        gateway: gateway_or_default(a.gateway, ALIPAY_GATEWAY)?,
        app_id: a.app_id,
        private_key: private_key.into_boxed_slice(),
        alipay_public_key: public_key.into_boxed_slice(),
        notify_url: a.notify_url,
        return_url: a.return_url,
    })
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
