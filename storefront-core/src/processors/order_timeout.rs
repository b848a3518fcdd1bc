//! OrderTimeoutWatcher processor.
//!
//! Periodically cancels orders left unpaid past `unpaid_timeout` (stock and
//! coupon are released) and confirms shipped orders the user never confirmed
//! within `unconfirmed_timeout`. Timeouts are re-read on every scan, and a
//! config reload resets the scan interval.

use kanau::processor::Processor;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::config::{ConfigStore, OrderTimeouts};
use crate::entities::order::GetStaleOrderIds;
use crate::framework::{DatabaseProcessor, now_utc};
use crate::order::OrderStatus;
use crate::services::{OrderServices, ServiceError};

pub struct OrderTimeoutWatcher {
    db: DatabaseProcessor,
    services: OrderServices,
    timeouts: ConfigStore<OrderTimeouts>,
    shutdown_rx: watch::Receiver<bool>,
}

impl OrderTimeoutWatcher {
    pub fn new(
        db: DatabaseProcessor,
        services: OrderServices,
        timeouts: ConfigStore<OrderTimeouts>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            db,
            services,
            timeouts,
            shutdown_rx,
        }
    }

    pub async fn run(mut self) {
        info!("OrderTimeoutWatcher started");
        let mut config_watcher = self.timeouts.subscribe();
        let mut interval = tokio::time::interval(self.timeouts.current().check_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("OrderTimeoutWatcher received shutdown signal");
                        break;
                    }
                }

                Some(timeouts) = config_watcher.next() => {
                    let period = timeouts.check_interval;
                    info!(period_secs = period.as_secs(), "Order timeout interval reloaded");
                    interval = tokio::time::interval(period);
                    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                }

                _ = interval.tick() => {
                    if let Err(e) = self.scan().await {
                        error!(error = %e, "Order timeout scan failed");
                    }
                }
            }
        }

        info!("OrderTimeoutWatcher shutdown complete");
    }

    async fn scan(&self) -> Result<(), ServiceError> {
        let timeouts = self.timeouts.current();
        let now = now_utc();

        let unpaid = self
            .db
            .process(GetStaleOrderIds {
                status: OrderStatus::Create,
                before: cutoff(now, timeouts.unpaid_timeout),
            })
            .await?;
        for order_id in unpaid {
            match self.services.cancel_unpaid(order_id).await {
                Ok(true) => info!(order_id, "Unpaid order cancelled by timeout"),
                Ok(false) => debug!(order_id, "Order left unpaid state before timeout"),
                Err(e) => error!(order_id, error = %e, "Failed to cancel unpaid order"),
            }
        }

        let unconfirmed = self
            .db
            .process(GetStaleOrderIds {
                status: OrderStatus::Ship,
                before: cutoff(now, timeouts.unconfirmed_timeout),
            })
            .await?;
        for order_id in unconfirmed {
            match self.services.confirm_unreceived(order_id).await {
                Ok(true) => info!(order_id, "Shipped order confirmed by timeout"),
                Ok(false) => debug!(order_id, "Order left shipped state before timeout"),
                Err(e) => error!(order_id, error = %e, "Failed to confirm shipped order"),
            }
        }

        Ok(())
    }
}

/// The point in time before which an order has timed out.
pub fn cutoff(now: time::PrimitiveDateTime, timeout: std::time::Duration) -> time::PrimitiveDateTime {
    time::Duration::try_from(timeout)
        .ok()
        .and_then(|timeout| now.checked_sub(timeout))
        .unwrap_or(time::PrimitiveDateTime::MIN)
}
