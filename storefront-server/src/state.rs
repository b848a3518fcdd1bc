//! Application state shared across all request handlers.

use crate::config::runtime::SharedConfig;
use sqlx::PgPool;
use storefront_core::events::EventSenders;
use storefront_core::framework::DatabaseProcessor;
use storefront_core::lock::SubmitLocks;
use storefront_core::payment::{AlipayGateway, WechatGateway};
use storefront_core::services::OrderServices;

/// Application state that is shared across all request handlers.
///
/// Everything is behind `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Runtime configuration with per-section locks (reloaded via SIGHUP).
    pub config: SharedConfig,
    /// In-process locks against duplicate order submission.
    pub submit_locks: SubmitLocks,
    /// Event senders for background processors.
    pub event_senders: EventSenders,
    /// Client for outbound gateway requests.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(db: PgPool, config: SharedConfig, event_senders: EventSenders) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            db,
            config,
            submit_locks: SubmitLocks::new(),
            event_senders,
            http,
        }
    }

    pub fn processor(&self) -> DatabaseProcessor {
        DatabaseProcessor {
            pool: self.db.clone(),
        }
    }

    pub fn services(&self) -> OrderServices {
        OrderServices::new(self.processor(), self.event_senders.clone())
    }

    /// A WeChat gateway built from the current configuration.
    pub async fn wechat_gateway(&self) -> WechatGateway {
        let config = self.config.wechat.read().await.clone();
        WechatGateway::new(config, self.http.clone())
    }

    /// An Alipay gateway built from the current configuration.
    pub async fn alipay_gateway(&self) -> AlipayGateway {
        AlipayGateway::new(self.config.alipay.read().await.clone())
    }
}
