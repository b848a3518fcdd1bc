//! Alipay open platform (RSA2 signatures, form-encoded notifications).

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use storefront_sdk::signature::{alipay_sign, alipay_verify};
use url::Url;

use super::{GatewayError, PaidNotice, PayOrder};
use crate::config::AlipayConfig;
use crate::order::pricing::format_yuan;

pub const ACK_SUCCESS: &str = "success";
pub const ACK_FAIL: &str = "fail";

const TIMESTAMP_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(serde::Serialize)]
struct WapPayContent<'a> {
    out_trade_no: &'a str,
    total_amount: String,
    subject: &'a str,
    product_code: &'static str,
}

pub struct AlipayGateway {
    config: AlipayConfig,
}

impl AlipayGateway {
    pub fn new(config: AlipayConfig) -> Self {
        Self { config }
    }

    /// Signed `alipay.trade.wap.pay` URL the user is redirected to.
    ///
    /// `now` is rendered in Beijing time as the gateway requires.
    pub fn wap_pay_url(
        &self,
        order: &PayOrder,
        now: time::OffsetDateTime,
    ) -> Result<Url, GatewayError> {
        if order.amount <= Decimal::ZERO {
            return Err(GatewayError::InvalidAmount(order.amount.to_string()));
        }
        let biz_content = serde_json::to_string(&WapPayContent {
            out_trade_no: &order.order_sn,
            total_amount: format_yuan(order.amount),
            subject: &order.subject,
            product_code: "QUICK_WAP_WAY",
        })
        .map_err(|e| GatewayError::Encode(e.to_string()))?;
        let timestamp = now
            .to_offset(time::macros::offset!(+8))
            .format(TIMESTAMP_FORMAT)
            .map_err(|e| GatewayError::Encode(e.to_string()))?;

        let mut params = BTreeMap::new();
        params.insert("app_id".to_string(), self.config.app_id.clone());
        params.insert("method".to_string(), "alipay.trade.wap.pay".to_string());
        params.insert("format".to_string(), "JSON".to_string());
        params.insert("charset".to_string(), "utf-8".to_string());
        params.insert("sign_type".to_string(), "RSA2".to_string());
        params.insert("timestamp".to_string(), timestamp);
        params.insert("version".to_string(), "1.0".to_string());
        params.insert("notify_url".to_string(), self.config.notify_url.to_string());
        if let Some(return_url) = &self.config.return_url {
            params.insert("return_url".to_string(), return_url.to_string());
        }
        params.insert("biz_content".to_string(), biz_content);
        let sign = alipay_sign(&params, &self.config.private_key)?;
        params.insert("sign".to_string(), sign);

        let mut url = self.config.gateway.clone();
        url.query_pairs_mut().extend_pairs(params.iter());
        Ok(url)
    }

    /// Verify a payment notification's form parameters.
    pub fn parse_notify(&self, params: &BTreeMap<String, String>) -> Result<PaidNotice, GatewayError> {
        alipay_verify(params, &self.config.alipay_public_key)?;

        if params.get("app_id") != Some(&self.config.app_id) {
            return Err(GatewayError::MerchantMismatch);
        }

        let trade_status = required(params, "trade_status")?;
        if !matches!(trade_status.as_str(), "TRADE_SUCCESS" | "TRADE_FINISHED") {
            return Err(GatewayError::NotPaid(trade_status.clone()));
        }

        let total_amount = required(params, "total_amount")?;
        let amount: Decimal = total_amount
            .parse()
            .map_err(|_| GatewayError::InvalidAmount(total_amount.clone()))?;

        Ok(PaidNotice {
            order_sn: required(params, "out_trade_no")?.clone(),
            pay_id: required(params, "trade_no")?.clone(),
            amount,
        })
    }
}

fn required<'a>(
    params: &'a BTreeMap<String, String>,
    field: &'static str,
) -> Result<&'a String, GatewayError> {
    params
        .get(field)
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_sdk::signature::decode_base64_key;

    // 2048-bit key pair generated for these tests only.
    const TEST_PRIVATE_KEY: &str = "MIIEvQIBADANBgkqhkiG9w0BAQEFAASCBKcwggSjAgEAAoIBAQCs3z3aoQH8/bas/iL4szHnFd+RtB26eHS5do2P8T0nO9hYc1JirsG+bP/kS1JN0s15Iq9eNJow+OW5IZ0g2hgITVQrByiJMsekJxBjnQ0XRYb48EqvDzrJ3rOz2mRRIYwOKhCXvmYLxIUHT262mB5Nr//PYIaRJbq1KLkIfjXiUUPPffVmj4o3sW8FhAiWZYIHTQAbDec/YR37ZYLH7pVjtmtOz8kTulbIn1RXQD5vUp9ivrsDDqCM59EZ0QAc9efIWnPieM/zwDJt42ZblypV0oVVBue8yeZIYVbGmw8TvcaWBW3osRwO8fi1w1v4FoarOR4pOBkHbgjG2EIKFABZAgMBAAECggEAExVVSA1aUXXmDLCExojMj1aZLqXQGtG5i/AwBiXysuIuuqvnWjSxt05jzK06bZQh4deP/aGnrFSLkn1pEbN1r/PuYM4aXdPk2USFMQPpKiqfENvA2NSg8CA1HPt0s8aU5grjeEbYz79+0mzku0QtYzTUs80zabI9K0quq2b4Vo5ky8MhtZLXvw6Ft7YdHlKeRW8rlIj9eCS3h6lRh/X/QxsHWTW1q8Nj3QAIUHfSIDmv8SpGjv4AVx175cSAU0t+Vj5/mAsk34AqQMwCiEhno3MMisPAm63T6TeIE9gwKeYVtLcGLr76PrsXMQeKkXVNiOi7Xb+PA/xbud1pB4mzsQKBgQDYUuFrKbCMuLdKwQZ8ld37lD10TPmNyHVHXK4h0ZlendQ40Jjk224Cr1oKtFapWLxiMF+GThe95MIYqrPaoSkXiDiZr1k4LNOPzp/L2RI3kf0CYy5L+wovfNFYYZNOAIoFos95TSPt8bhioFCM+gbuXj3CKI9QyZqhaSZge0fVqQKBgQDMlCiZzNJGiheGIX3L0mVrUNvAD9vCXTz2Si+drHXgKMDaQWuWxolR0Nlr/t2MSxeVm6K+hyWk7WTX1Yb0S9iTD47wHXNF/w2WdtO0DDgn7GRu8f60jjnBS1CJjVRK4Vyli/YaDbHUs4DvTubUUWTFsDBKZQYViO5q3ZzUnO4jMQKBgAFXEhpt2bAlfM0zwOyIqSVj17WevHUKZt+YTWPcPoz9gVEQycGxMk9F8tLaJydJa3FYR183oKIGhsVMWWzjTrPcni0ljvHwJSdg6lCC+b/qYZzgLGtAFOISbeGUSStUiYZbadmghrZ0puXFhHo7GkvjvZI0Wh7wAMs7MYere9hxAoGBAI1ZHMhPNUYZqXE6eLE4GGzSfFKyYlNjmnhM/6NAgl0zqzPhmZWebUiDNYYhnS+OvqfW1dYwiHjwsQlTdiAau3O4fzk2D+xf8iJwzYsMGkyzTx08xJA56Hu+LtIrPP9TwHB9SLftmF3u/HncGS6/YhIYzvTH4jFE3/4kSnS4TO0xAoGAN/p5XWbfg4AKq+8vYZYTUmKECS+Jc+/rPvKExHS2oOm4Dwm1d74BcpmvhZgIY/n+lL1Hf3bYeLj/aaehRwA5Xqv5iChWh3qbiiBrpEBUNfyKSzYqY7ZCGN9uELjdjfZ+/KXhHoL6j89ZV8n4agUfZDnTt+VoNMcA7wAEcyBPGyI=";
    const TEST_PUBLIC_KEY_SPKI: &str = "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEArN892qEB/P22rP4i+LMx5xXfkbQdunh0uXaNj/E9JzvYWHNSYq7Bvmz/5EtSTdLNeSKvXjSaMPjluSGdINoYCE1UKwcoiTLHpCcQY50NF0WG+PBKrw86yd6zs9pkUSGMDioQl75mC8SFB09utpgeTa//z2CGkSW6tSi5CH414lFDz331Zo+KN7FvBYQIlmWCB00AGw3nP2Ed+2WCx+6VY7ZrTs/JE7pWyJ9UV0A+b1KfYr67Aw6gjOfRGdEAHPXnyFpz4njP88AybeNmW5cqVdKFVQbnvMnmSGFWxpsPE73GlgVt6LEcDvH4tcNb+BaGqzkeKTgZB24IxthCChQAWQIDAQAB";

    fn gateway() -> AlipayGateway {
        AlipayGateway::new(AlipayConfig {
            app_id: "2021000000000001".to_string(),
            private_key: decode_base64_key(TEST_PRIVATE_KEY).unwrap().into(),
            // The notification is signed with the same test key pair.
            alipay_public_key: decode_base64_key(TEST_PUBLIC_KEY_SPKI).unwrap().into(),
            notify_url: Url::parse("https://shop.example.com/wx/order/alipay-notify").unwrap(),
            return_url: Some(Url::parse("https://shop.example.com/orders").unwrap()),
            gateway: Url::parse("https://openapi.alipay.com/gateway.do").unwrap(),
        })
    }

    fn signed_notify(trade_status: &str, app_id: &str) -> BTreeMap<String, String> {
        let mut params: BTreeMap<String, String> = [
            ("app_id", app_id),
            ("out_trade_no", "20240307123456"),
            ("trade_no", "2024030722001400000000000001"),
            ("trade_status", trade_status),
            ("total_amount", "52.98"),
            ("notify_type", "trade_status_sync"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let private_key = decode_base64_key(TEST_PRIVATE_KEY).unwrap();
        let sign = alipay_sign(&params, &private_key).unwrap();
        params.insert("sign".to_string(), sign);
        params.insert("sign_type".to_string(), "RSA2".to_string());
        params
    }

    #[test]
    fn test_parse_paid_notify() {
        let notice = gateway()
            .parse_notify(&signed_notify("TRADE_SUCCESS", "2021000000000001"))
            .unwrap();
        assert_eq!(notice.order_sn, "20240307123456");
        assert_eq!(notice.pay_id, "2024030722001400000000000001");
        assert_eq!(notice.amount, Decimal::new(5298, 2));
    }

    #[test]
    fn test_finished_trade_counts_as_paid() {
        assert!(
            gateway()
                .parse_notify(&signed_notify("TRADE_FINISHED", "2021000000000001"))
                .is_ok()
        );
    }

    #[test]
    fn test_waiting_trade_is_not_paid() {
        assert!(matches!(
            gateway().parse_notify(&signed_notify("WAIT_BUYER_PAY", "2021000000000001")),
            Err(GatewayError::NotPaid(status)) if status == "WAIT_BUYER_PAY"
        ));
    }

    #[test]
    fn test_tampered_notify_is_rejected() {
        let mut params = signed_notify("TRADE_SUCCESS", "2021000000000001");
        params.insert("total_amount".to_string(), "0.01".to_string());
        assert!(matches!(
            gateway().parse_notify(&params),
            Err(GatewayError::Signature(_))
        ));
    }

    #[test]
    fn test_notify_for_other_app() {
        assert!(matches!(
            gateway().parse_notify(&signed_notify("TRADE_SUCCESS", "2021999999999999")),
            Err(GatewayError::MerchantMismatch)
        ));
    }

    #[test]
    fn test_wap_pay_url() {
        let gateway = gateway();
        let order = PayOrder::new("20240307123456", Decimal::new(5298, 2));
        let now = time::macros::datetime!(2024-03-07 02:30:00 UTC);
        let url = gateway.wap_pay_url(&order, now).unwrap();

        assert_eq!(url.host_str(), Some("openapi.alipay.com"));
        let params: BTreeMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(params["method"], "alipay.trade.wap.pay");
        assert_eq!(params["timestamp"], "2024-03-07 10:30:00");
        assert_eq!(params["return_url"], "https://shop.example.com/orders");

        let content: serde_json::Value = serde_json::from_str(&params["biz_content"]).unwrap();
        assert_eq!(content["total_amount"], "52.98");
        assert_eq!(content["subject"], "order: 20240307123456");
        assert_eq!(content["product_code"], "QUICK_WAP_WAY");

        let public_key = decode_base64_key(TEST_PUBLIC_KEY_SPKI).unwrap();
        alipay_verify(&params, &public_key).unwrap();
    }

    #[test]
    fn test_wap_pay_rejects_zero_amount() {
        let order = PayOrder::new("20240307123456", Decimal::ZERO);
        assert!(matches!(
            gateway().wap_pay_url(&order, time::OffsetDateTime::UNIX_EPOCH),
            Err(GatewayError::InvalidAmount(_))
        ));
    }
}
