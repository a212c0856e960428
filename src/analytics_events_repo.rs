use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;

use crate::analytics_events::{AnalyticsEvent, NewAnalyticsEvent};
use crate::web::PgPool;
use crate::webhook_dispatcher::AnalyticsSink;

#[derive(Clone)]
pub struct AnalyticsEventsRepository {
    pool: PgPool,
}

impl AnalyticsEventsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a new analytics event
    pub async fn create(&self, new_event: NewAnalyticsEvent) -> Result<AnalyticsEvent> {
        use crate::schema::analytics_events::dsl;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let inserted: AnalyticsEvent = diesel::insert_into(dsl::analytics_events)
                .values(&new_event)
                .get_result(&mut conn)?;

            Ok::<AnalyticsEvent, anyhow::Error>(inserted)
        })
        .await??;

        Ok(result)
    }

    /// Get events targeting a specific user, newest first
    pub async fn get_by_target_user(&self, target_user_id: &str) -> Result<Vec<AnalyticsEvent>> {
        use crate::schema::analytics_events::dsl;

        let pool = self.pool.clone();
        let target_user_id = target_user_id.to_string();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let events: Vec<AnalyticsEvent> = dsl::analytics_events
                .filter(dsl::target_user_id.eq(&target_user_id))
                .order_by(dsl::created_at.desc())
                .load::<AnalyticsEvent>(&mut conn)?;

            Ok::<Vec<AnalyticsEvent>, anyhow::Error>(events)
        })
        .await??;

        Ok(result)
    }
}

#[async_trait]
impl AnalyticsSink for AnalyticsEventsRepository {
    async fn emit(&self, new_event: NewAnalyticsEvent) -> Result<()> {
        self.create(new_event).await?;
        Ok(())
    }
}
