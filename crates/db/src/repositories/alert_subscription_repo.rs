//! Repository for the `alert_subscriptions` table.

use aurora_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::alert_subscription::{AlertSubscription, CreateAlertSubscription};

const COLUMNS: &str = "id, aoi_id, webhook_url, is_active, failure_count, last_alert_at, created_at";

/// Provides query operations for webhook alert subscriptions.
pub struct AlertSubscriptionRepo;

impl AlertSubscriptionRepo {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreateAlertSubscription,
    ) -> Result<AlertSubscription, sqlx::Error> {
        let query = format!(
            "INSERT INTO alert_subscriptions (aoi_id, webhook_url) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertSubscription>(&query)
            .bind(input.aoi_id)
            .bind(&input.webhook_url)
            .fetch_one(executor)
            .await
    }

    /// Active subscriptions for an AOI, including global ones.
    pub async fn list_for_aoi<'e, E: PgExecutor<'e>>(
        executor: E,
        aoi_id: DbId,
    ) -> Result<Vec<AlertSubscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alert_subscriptions \
             WHERE is_active AND (aoi_id = $1 OR aoi_id IS NULL) \
             ORDER BY id"
        );
        sqlx::query_as::<_, AlertSubscription>(&query)
            .bind(aoi_id)
            .fetch_all(executor)
            .await
    }

    /// Record a delivery outcome: reset the failure count on success,
    /// increment it on failure.
    pub async fn record_delivery<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        success: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE alert_subscriptions SET \
                last_alert_at = NOW(), \
                failure_count = CASE WHEN $2 THEN 0 ELSE failure_count + 1 END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(success)
        .execute(executor)
        .await?;
        Ok(())
    }
}
