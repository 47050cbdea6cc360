/// Background jobs
use crate::context::AppContext;
use crate::error::WaypointResult;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::store_health_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Periodic store health check (runs every minute)
    async fn store_health_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(60));

        loop {
            interval.tick().await;

            if let Err(e) = check_stores(&scheduler.context).await {
                error!("Store health check failed: {}", e);
            }
        }
    }
}

/// Probe the database and the cache backend
pub async fn check_stores(ctx: &AppContext) -> WaypointResult<()> {
    sqlx::query("SELECT 1").execute(&ctx.db).await?;
    ctx.cache.has_key("Health", "probe").await?;
    Ok(())
}
