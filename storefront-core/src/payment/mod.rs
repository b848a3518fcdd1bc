//! Hosted checkout and payment notification handling for the two supported
//! gateways.
//!
//! Gateways are built from a configuration snapshot for each request, so a
//! reload takes effect on the next payment.

pub mod alipay;
pub mod wechat;

pub use alipay::AlipayGateway;
pub use wechat::WechatGateway;

use rust_decimal::Decimal;
use storefront_sdk::signature::SignatureError;

/// An order to be paid through a hosted checkout page.
#[derive(Debug, Clone, PartialEq)]
pub struct PayOrder {
    pub order_sn: String,
    /// Amount in yuan.
    pub amount: Decimal,
    pub subject: String,
}

impl PayOrder {
    pub fn new(order_sn: impl Into<String>, amount: Decimal) -> Self {
        let order_sn = order_sn.into();
        Self {
            subject: format!("order: {order_sn}"),
            order_sn,
            amount,
        }
    }
}

/// A verified payment notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidNotice {
    /// Our order serial number (`out_trade_no`).
    pub order_sn: String,
    /// The gateway's transaction id.
    pub pay_id: String,
    /// Amount paid, in yuan.
    pub amount: Decimal,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("failed to encode XML: {0}")]
    XmlEncode(#[from] quick_xml::SeError),
    #[error("failed to encode request: {0}")]
    Encode(String),
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway rejected the request: {code}: {message}")]
    Upstream { code: String, message: String },
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid amount `{0}`")]
    InvalidAmount(String),
    #[error("payment not completed: {0}")]
    NotPaid(String),
    #[error("notification is for another merchant")]
    MerchantMismatch,
    #[error("invalid gateway URL: {0}")]
    Url(#[from] url::ParseError),
}
