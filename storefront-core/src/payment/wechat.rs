//! WeChat Pay v2 (XML API, HMAC-SHA256 signatures).

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use storefront_sdk::signature::{wechat_sign, wechat_verify};
use url::Url;

use super::{GatewayError, PaidNotice, PayOrder};
use crate::config::WechatConfig;
use crate::order::pricing::yuan_to_cents;

/// Body answered to a notification that was processed.
pub const ACK_SUCCESS: &str =
    "<xml><return_code><![CDATA[SUCCESS]]></return_code><return_msg><![CDATA[OK]]></return_msg></xml>";

/// Body answered to a notification that should be retried.
pub const ACK_FAIL: &str =
    "<xml><return_code><![CDATA[FAIL]]></return_code><return_msg><![CDATA[FAIL]]></return_msg></xml>";

const SUCCESS: &str = "SUCCESS";

pub struct WechatGateway {
    config: WechatConfig,
    http: reqwest::Client,
}

impl WechatGateway {
    pub fn new(config: WechatConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Signed parameters of an `unifiedorder` request for a mobile-web payment.
    pub fn unified_order_params(
        &self,
        order: &PayOrder,
        nonce: &str,
    ) -> Result<BTreeMap<String, String>, GatewayError> {
        let total_fee = yuan_to_cents(order.amount)
            .ok_or_else(|| GatewayError::InvalidAmount(order.amount.to_string()))?;

        let mut params = BTreeMap::new();
        params.insert("appid".to_string(), self.config.app_id.clone());
        params.insert("mch_id".to_string(), self.config.mch_id.clone());
        params.insert("nonce_str".to_string(), nonce.to_string());
        params.insert("sign_type".to_string(), "HMAC-SHA256".to_string());
        params.insert("body".to_string(), order.subject.clone());
        params.insert("out_trade_no".to_string(), order.order_sn.clone());
        params.insert("total_fee".to_string(), total_fee.to_string());
        params.insert(
            "spbill_create_ip".to_string(),
            self.config.client_ip.clone(),
        );
        params.insert(
            "notify_url".to_string(),
            self.config.notify_url.to_string(),
        );
        params.insert("trade_type".to_string(), "MWEB".to_string());
        let sign = wechat_sign(&params, &self.config.api_key);
        params.insert("sign".to_string(), sign);
        Ok(params)
    }

    /// Create a mobile-web payment and return the hosted checkout URL.
    #[tracing::instrument(skip_all, fields(order_sn = %order.order_sn))]
    pub async fn create_wap_payment(&self, order: &PayOrder) -> Result<Url, GatewayError> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let params = self.unified_order_params(order, &nonce)?;
        let body = quick_xml::se::to_string_with_root("xml", &params)?;

        let endpoint = self.config.gateway.join("pay/unifiedorder")?;
        let response = self
            .http
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        self.parse_unified_order_response(&response)
    }

    /// Verify an `unifiedorder` response and extract `mweb_url`.
    pub fn parse_unified_order_response(&self, body: &str) -> Result<Url, GatewayError> {
        let params: BTreeMap<String, String> = quick_xml::de::from_str(body)?;
        check_codes(&params)?;
        wechat_verify(&params, &self.config.api_key)?;
        let mweb_url = params
            .get("mweb_url")
            .ok_or(GatewayError::MissingField("mweb_url"))?;
        Ok(Url::parse(mweb_url)?)
    }

    /// Verify a payment notification body.
    pub fn parse_notify(&self, body: &str) -> Result<PaidNotice, GatewayError> {
        let params: BTreeMap<String, String> = quick_xml::de::from_str(body)?;
        wechat_verify(&params, &self.config.api_key)?;
        check_codes(&params)?;

        if params.get("appid") != Some(&self.config.app_id)
            || params.get("mch_id") != Some(&self.config.mch_id)
        {
            return Err(GatewayError::MerchantMismatch);
        }

        let order_sn = required(&params, "out_trade_no")?;
        let pay_id = required(&params, "transaction_id")?;
        let total_fee = required(&params, "total_fee")?;
        let cents: i64 = total_fee
            .parse()
            .map_err(|_| GatewayError::InvalidAmount(total_fee.clone()))?;

        Ok(PaidNotice {
            order_sn: order_sn.clone(),
            pay_id: pay_id.clone(),
            amount: Decimal::new(cents, 2),
        })
    }
}

fn check_codes(params: &BTreeMap<String, String>) -> Result<(), GatewayError> {
    let return_code = required(params, "return_code")?;
    if return_code != SUCCESS {
        return Err(GatewayError::Upstream {
            code: return_code.clone(),
            message: params.get("return_msg").cloned().unwrap_or_default(),
        });
    }
    let result_code = required(params, "result_code")?;
    if result_code != SUCCESS {
        return Err(GatewayError::NotPaid(
            params
                .get("err_code_des")
                .or_else(|| params.get("err_code"))
                .cloned()
                .unwrap_or_else(|| result_code.clone()),
        ));
    }
    Ok(())
}

fn required<'a>(
    params: &'a BTreeMap<String, String>,
    field: &'static str,
) -> Result<&'a String, GatewayError> {
    params.get(field).ok_or(GatewayError::MissingField(field))
}
