//! TOML file configuration structures.
//!
//! These structs directly map to the `storefront-config.toml` file format.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub mall: MallConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    pub wechat: WechatConfig,
    pub alipay: AlipayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080)
}

/// User token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token_secret: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
}

fn default_token_ttl_secs() -> i64 {
    7 * 24 * 60 * 60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MallConfig {
    /// Goods totals below this pay `freight_value`.
    #[serde(default = "default_freight_min")]
    pub freight_min: Decimal,
    #[serde(default = "default_freight_value")]
    pub freight_value: Decimal,
    #[serde(default = "default_submit_lock_ttl_secs")]
    pub submit_lock_ttl_secs: u64,
    /// Admin notices are POSTed here; they are only logged when unset.
    #[serde(default)]
    pub notify_url: Option<Url>,
}

impl Default for MallConfig {
    fn default() -> Self {
        Self {
            freight_min: default_freight_min(),
            freight_value: default_freight_value(),
            submit_lock_ttl_secs: default_submit_lock_ttl_secs(),
            notify_url: None,
        }
    }
}

fn default_freight_min() -> Decimal {
    Decimal::new(88, 0)
}

fn default_freight_value() -> Decimal {
    Decimal::new(8, 0)
}

fn default_submit_lock_ttl_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_unpaid_timeout_minutes")]
    pub unpaid_timeout_minutes: u64,
    #[serde(default = "default_unconfirmed_timeout_days")]
    pub unconfirmed_timeout_days: u64,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            unpaid_timeout_minutes: default_unpaid_timeout_minutes(),
            unconfirmed_timeout_days: default_unconfirmed_timeout_days(),
            check_interval_secs: default_check_interval_secs(),
        }
    }
}

fn default_unpaid_timeout_minutes() -> u64 {
    30
}

fn default_unconfirmed_timeout_days() -> u64 {
    7
}

fn default_check_interval_secs() -> u64 {
    60
}

/// WeChat Pay merchant section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WechatConfig {
    pub app_id: String,
    pub mch_id: String,
    pub api_key: String,
    pub notify_url: Url,
    #[serde(default = "default_client_ip")]
    pub client_ip: String,
    /// Overrides the production API host.
    #[serde(default)]
    pub gateway: Option<Url>,
}

fn default_client_ip() -> String {
    "127.0.0.1".to_string()
}

/// Alipay application section. Keys are standard base64 DER.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlipayConfig {
    pub app_id: String,
    /// PKCS#8 private key of the application.
    pub private_key: String,
    /// Alipay's public key (SPKI).
    pub alipay_public_key: String,
    pub notify_url: Url,
    #[serde(default)]
    pub return_url: Option<Url>,
    #[serde(default)]
    pub gateway: Option<Url>,
}

pub const WECHAT_GATEWAY: &str = "https://api.mch.weixin.qq.com/";
pub const ALIPAY_GATEWAY: &str = "https://openapi.alipay.com/gateway.do";

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[auth]
token_secret = "secret"

[wechat]
app_id = "wx123"
mch_id = "1900000109"
api_key = "key"
notify_url = "https://shop.example.com/wx/order/wx-notify"

[alipay]
app_id = "2021000000000000"
private_key = "AAAA"
alipay_public_key = "BBBB"
notify_url = "https://shop.example.com/wx/order/alipay-notify"
"#;

    #[test]
    fn test_parse_minimal_config() {
        let config: FileConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert_eq!(config.auth.token_ttl_secs, 604_800);
        assert_eq!(config.mall.freight_min, Decimal::new(88, 0));
        assert_eq!(config.mall.freight_value, Decimal::new(8, 0));
        assert_eq!(config.mall.submit_lock_ttl_secs, 10);
        assert!(config.mall.notify_url.is_none());
        assert_eq!(config.timeouts.unpaid_timeout_minutes, 30);
        assert_eq!(config.timeouts.unconfirmed_timeout_days, 7);
        assert_eq!(config.timeouts.check_interval_secs, 60);
        assert_eq!(config.wechat.client_ip, "127.0.0.1");
        assert!(config.wechat.gateway.is_none());
        assert!(config.alipay.return_url.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = format!(
            r#"
[server]
listen = "127.0.0.1:9000"

[mall]
freight_min = "100.50"
freight_value = "12"
submit_lock_ttl_secs = 30
notify_url = "https://admin.example.com/hooks"

[timeouts]
unpaid_timeout_minutes = 15
unconfirmed_timeout_days = 10
check_interval_secs = 5
{MINIMAL}"#
        );
        let config: FileConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 9000);
        assert_eq!(config.mall.freight_min, Decimal::new(10050, 2));
        assert_eq!(config.mall.submit_lock_ttl_secs, 30);
        assert_eq!(
            config.mall.notify_url.unwrap().as_str(),
            "https://admin.example.com/hooks"
        );
        assert_eq!(config.timeouts.check_interval_secs, 5);
    }

    #[test]
    fn test_missing_payment_section_is_rejected() {
        let result: Result<FileConfig, _> = toml::from_str(
            r#"
[auth]
token_secret = "secret"
"#,
        );
        assert!(result.is_err());
    }
}
