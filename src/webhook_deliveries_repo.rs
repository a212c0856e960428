use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::web::PgPool;
use crate::webhook_deliveries::{NewWebhookDelivery, WebhookDelivery};
use crate::webhook_dispatcher::DeliveryJournal;

#[derive(Clone)]
pub struct WebhookDeliveriesRepository {
    pool: PgPool,
}

impl WebhookDeliveriesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Journal a new delivery
    pub async fn create(&self, new_delivery: NewWebhookDelivery) -> Result<WebhookDelivery> {
        use crate::schema::webhook_deliveries::dsl;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let inserted: WebhookDelivery = diesel::insert_into(dsl::webhook_deliveries)
                .values(&new_delivery)
                .get_result(&mut conn)?;

            Ok::<WebhookDelivery, anyhow::Error>(inserted)
        })
        .await??;

        Ok(result)
    }

    /// Mark a delivery as processed
    pub async fn set_processed(&self, delivery_id: Uuid) -> Result<()> {
        use crate::schema::webhook_deliveries;

        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            diesel::update(webhook_deliveries::table)
                .filter(webhook_deliveries::id.eq(delivery_id))
                .set(webhook_deliveries::processed.eq(true))
                .execute(&mut conn)?;

            Ok::<(), anyhow::Error>(())
        })
        .await??;

        Ok(())
    }

    /// Mark a delivery as failed with an error message
    pub async fn set_failed(&self, delivery_id: Uuid, error: &str) -> Result<()> {
        use crate::schema::webhook_deliveries;

        let pool = self.pool.clone();
        let error = error.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            diesel::update(webhook_deliveries::table)
                .filter(webhook_deliveries::id.eq(delivery_id))
                .set((
                    webhook_deliveries::processed.eq(true),
                    webhook_deliveries::processing_error.eq(Some(&error)),
                ))
                .execute(&mut conn)?;

            Ok::<(), anyhow::Error>(())
        })
        .await??;

        Ok(())
    }

    /// Get the most recent journal entries
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<WebhookDelivery>> {
        use crate::schema::webhook_deliveries::dsl;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let deliveries: Vec<WebhookDelivery> = dsl::webhook_deliveries
                .order_by(dsl::created_at.desc())
                .limit(limit)
                .load::<WebhookDelivery>(&mut conn)?;

            Ok::<Vec<WebhookDelivery>, anyhow::Error>(deliveries)
        })
        .await??;

        Ok(result)
    }
}

#[async_trait]
impl DeliveryJournal for WebhookDeliveriesRepository {
    async fn record(&self, new_delivery: NewWebhookDelivery) -> Result<WebhookDelivery> {
        self.create(new_delivery).await
    }

    async fn mark_processed(&self, delivery_id: Uuid) -> Result<()> {
        self.set_processed(delivery_id).await
    }

    async fn mark_failed(&self, delivery_id: Uuid, error: &str) -> Result<()> {
        self.set_failed(delivery_id, error).await
    }
}
