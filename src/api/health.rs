/// Health check endpoints
///
/// Liveness is a bare reply; readiness verifies the database and the cache
/// backend can be reached.
use crate::{context::AppContext, error::WaypointResult};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};

/// Build health routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/ready", get(readiness_probe))
}

/// Basic health check
pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe: can we serve traffic?
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Err(e) = check_database(&ctx).await {
        tracing::warn!(error = %e, "readiness_probe_failed: database check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    if let Err(e) = check_cache(&ctx).await {
        tracing::warn!(error = %e, "readiness_probe_failed: cache check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// Check database connectivity
async fn check_database(ctx: &AppContext) -> WaypointResult<()> {
    sqlx::query("SELECT 1").execute(&ctx.db).await?;
    Ok(())
}

/// Check the cache backend responds to a probe key
async fn check_cache(ctx: &AppContext) -> WaypointResult<()> {
    let _ = ctx.cache.has_key("Health", "probe").await?;
    Ok(())
}
