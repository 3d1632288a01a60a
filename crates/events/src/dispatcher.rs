//! Alert fan-out service.
//!
//! [`AlertDispatcher`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and posts every alert to the active webhook subscriptions of its AOI
//! (plus global subscriptions). It runs as a long-lived background task and
//! exits when the bus is dropped.

use aurora_db::repositories::AlertSubscriptionRepo;
use aurora_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::AlertEvent;
use crate::delivery::webhook::WebhookDelivery;

pub struct AlertDispatcher {
    pool: DbPool,
    webhook: WebhookDelivery,
}

impl AlertDispatcher {
    pub fn new(pool: DbPool, webhook: WebhookDelivery) -> Self {
        Self { pool, webhook }
    }

    /// Run the dispatch loop until the channel closes.
    pub async fn run(self, mut receiver: broadcast::Receiver<AlertEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.dispatch(&event).await {
                        tracing::error!(
                            error = %e,
                            kind = %event.kind,
                            aoi_id = event.aoi_id,
                            "Failed to load alert subscriptions"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Alert dispatcher lagged, some alerts were not delivered");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, alert dispatcher shutting down");
                    break;
                }
            }
        }
    }

    /// Deliver one alert to every matching subscription and record each
    /// outcome. Delivery failures are logged, not returned.
    async fn dispatch(&self, event: &AlertEvent) -> Result<(), sqlx::Error> {
        let subscriptions = AlertSubscriptionRepo::list_for_aoi(&self.pool, event.aoi_id).await?;

        for sub in subscriptions {
            let success = match self.webhook.deliver(&sub.webhook_url, event).await {
                Ok(()) => {
                    tracing::debug!(subscription_id = sub.id, kind = %event.kind, "Alert delivered");
                    true
                }
                Err(e) => {
                    tracing::warn!(subscription_id = sub.id, error = %e, "Alert delivery failed");
                    false
                }
            };
            AlertSubscriptionRepo::record_delivery(&self.pool, sub.id, success).await?;
        }
        Ok(())
    }
}
