//! AdminNotifier processor.
//!
//! Receives `OrderEvent`s, loads the order and POSTs an `AdminNotice` JSON
//! body to the configured notify URL. Failed deliveries are retried with
//! exponential backoff (2^0 to 2^5 seconds). Without a notify URL the notice
//! is only logged.

use std::sync::Arc;

use kanau::processor::Processor;
use storefront_sdk::objects::notify::AdminNotice;
use thiserror::Error;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::MallConfig;
use crate::entities::order::{GetOrderById, Order};
use crate::events::{OrderEvent, OrderEventReceiver};
use crate::framework::DatabaseProcessor;

/// Maximum retry attempts (2^5 = 32 seconds max backoff)
const MAX_RETRY_COUNT: u32 = 5;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("order not found: {0}")]
    OrderNotFound(i64),

    #[error("notice delivery failed with status {status}: {body}")]
    DeliveryFailed { status: u16, body: String },
}

pub struct AdminNotifier {
    db: DatabaseProcessor,
    mall: Arc<RwLock<MallConfig>>,
    event_rx: OrderEventReceiver,
    shutdown_rx: watch::Receiver<bool>,
    http_client: reqwest::Client,
}

impl AdminNotifier {
    pub fn new(
        db: DatabaseProcessor,
        mall: Arc<RwLock<MallConfig>>,
        event_rx: OrderEventReceiver,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            db,
            mall,
            event_rx,
            shutdown_rx,
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    pub async fn run(mut self) {
        info!("AdminNotifier started");
        let mut deliveries = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("AdminNotifier received shutdown signal");
                        break;
                    }
                }

                Some(event) = self.event_rx.recv() => {
                    debug!(event = ?event, "Received OrderEvent");
                    match self.prepare(event).await {
                        Ok(Some((url, notice))) => {
                            let http_client = self.http_client.clone();
                            deliveries.spawn(async move {
                                if let Err(e) = deliver_with_retry(&http_client, &url, &notice).await {
                                    error!(order_id = notice.order_id, error = %e, "Admin notice dropped after retries");
                                }
                            });
                        }
                        Ok(None) => {}
                        Err(e) => error!(error = %e, "Failed to prepare admin notice"),
                    }
                }

                Some(_) = deliveries.join_next(), if !deliveries.is_empty() => {}

                else => {
                    info!("OrderEvent channel closed");
                    break;
                }
            }
        }

        if !deliveries.is_empty() {
            warn!(pending = deliveries.len(), "Aborting pending admin notices");
        }
        deliveries.shutdown().await;
        info!("AdminNotifier shutdown complete");
    }

    /// Build the notice for an event. Returns `None` when it was only logged.
    async fn prepare(&self, event: OrderEvent) -> Result<Option<(url::Url, AdminNotice)>, NotifyError> {
        let order_id = event.order_id();
        let order = self
            .db
            .process(GetOrderById { order_id })
            .await?
            .ok_or(NotifyError::OrderNotFound(order_id))?;
        let notice = build_notice(&event, &order, time::OffsetDateTime::now_utc().unix_timestamp());

        let notify_url = self.mall.read().await.notify_url.clone();
        match notify_url {
            Some(url) => Ok(Some((url, notice))),
            None => {
                info!(
                    event_type = %notice.event_type,
                    order_id = notice.order_id,
                    order_sn = %notice.order_sn,
                    actual_price = %notice.actual_price,
                    "Admin notice (no notify URL configured)"
                );
                Ok(None)
            }
        }
    }
}

pub fn build_notice(event: &OrderEvent, order: &Order, timestamp: i64) -> AdminNotice {
    AdminNotice {
        event_type: event.event_type().to_string(),
        order_id: order.id,
        order_sn: order.order_sn.clone(),
        actual_price: order.actual_price.to_string(),
        timestamp,
    }
}

async fn deliver_with_retry(
    http_client: &reqwest::Client,
    url: &url::Url,
    notice: &AdminNotice,
) -> Result<(), NotifyError> {
    let mut retry_count = 0;
    loop {
        match send_notice(http_client, url, notice).await {
            Ok(()) => {
                info!(order_id = notice.order_id, retry_count, "Admin notice delivered");
                return Ok(());
            }
            Err(e) if retry_count < MAX_RETRY_COUNT => {
                warn!(
                    order_id = notice.order_id,
                    error = %e,
                    retry_count,
                    "Admin notice delivery failed"
                );
                tokio::time::sleep(calculate_retry_delay(retry_count)).await;
                retry_count += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn send_notice(
    http_client: &reqwest::Client,
    url: &url::Url,
    notice: &AdminNotice,
) -> Result<(), NotifyError> {
    let response = http_client.post(url.clone()).json(notice).send().await?;
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::DeliveryFailed {
            status: status.as_u16(),
            body,
        })
    }
}

/// Calculate the next retry delay based on retry count.
///
/// Uses exponential backoff: 2^retry_count seconds.
pub fn calculate_retry_delay(retry_count: u32) -> std::time::Duration {
    let seconds = 2u64.pow(retry_count.min(MAX_RETRY_COUNT));
    std::time::Duration::from_secs(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use rust_decimal::Decimal;
    use time::macros::datetime;

    #[test]
    fn test_retry_delay_calculation() {
        assert_eq!(calculate_retry_delay(0), std::time::Duration::from_secs(1));
        assert_eq!(calculate_retry_delay(1), std::time::Duration::from_secs(2));
        assert_eq!(calculate_retry_delay(4), std::time::Duration::from_secs(16));
        assert_eq!(calculate_retry_delay(5), std::time::Duration::from_secs(32));
        // Max capped at 5
        assert_eq!(calculate_retry_delay(6), std::time::Duration::from_secs(32));
        assert_eq!(calculate_retry_delay(100), std::time::Duration::from_secs(32));
    }

    #[test]
    fn test_build_notice() {
        let order = Order {
            id: 12,
            user_id: 3,
            order_sn: "20240307654321".to_string(),
            order_status: OrderStatus::Refund,
            consignee: String::new(),
            mobile: String::new(),
            address: String::new(),
            message: String::new(),
            goods_price: Decimal::new(5298, 2),
            freight_price: Decimal::ZERO,
            coupon_price: Decimal::ZERO,
            integral_price: Decimal::ZERO,
            groupon_price: Decimal::ZERO,
            order_price: Decimal::new(5298, 2),
            actual_price: Decimal::new(5298, 2),
            pay_id: Some("tx-1".to_string()),
            pay_time: None,
            ship_sn: None,
            ship_channel: None,
            ship_time: None,
            refund_amount: None,
            refund_time: None,
            confirm_time: None,
            comments: 0,
            end_time: None,
            add_time: datetime!(2024-03-07 00:00),
            update_time: datetime!(2024-03-07 00:00),
        };
        let notice = build_notice(&OrderEvent::RefundRequested { order_id: 12 }, &order, 1_700_000_000);
        assert_eq!(notice.event_type, "refund_requested");
        assert_eq!(notice.order_sn, "20240307654321");
        assert_eq!(notice.actual_price, "52.98");
        assert_eq!(notice.timestamp, 1_700_000_000);
    }
}
