//! Payment gateway credentials.

use url::Url;

/// WeChat Pay v2 merchant settings.
#[derive(Debug, Clone)]
pub struct WechatConfig {
    pub app_id: String,
    pub mch_id: String,
    /// API key used for HMAC-SHA256 signing.
    pub api_key: String,
    pub notify_url: Url,
    /// Client IP reported in `spbill_create_ip`.
    pub client_ip: String,
    /// Base URL of the pay API, `https://api.mch.weixin.qq.com` in production.
    pub gateway: Url,
}

/// Alipay open platform settings.
#[derive(Debug, Clone)]
pub struct AlipayConfig {
    pub app_id: String,
    /// PKCS#8 DER RSA private key of the application.
    pub private_key: Box<[u8]>,
    /// Alipay's RSA public key, SPKI or PKCS#1 DER.
    pub alipay_public_key: Box<[u8]>,
    pub notify_url: Url,
    pub return_url: Option<Url>,
    /// `https://openapi.alipay.com/gateway.do` in production.
    pub gateway: Url,
}
