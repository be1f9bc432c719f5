/*!
 * # Health Check Module
 *
 * Probe endpoints for load balancers and orchestrators:
 *
 * - Basic health check (`/health`) - process is up, with database status
 * - Readiness check (`/health/ready`) - database answers a ping
 * - Liveness check (`/health/live`) - process is alive
 * - Version (`/health/version`) - build information
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

impl HealthStatus {
    fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Up => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
}

#[derive(Clone)]
pub struct HealthState {
    pub db_pool: Arc<DatabaseConnection>,
    pub start_time: SystemTime,
}

impl HealthState {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self {
            db_pool,
            start_time: SystemTime::now(),
        }
    }

    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
    }

    async fn database_status(&self) -> HealthStatus {
        match crate::db::check_connection(&self.db_pool).await {
            Ok(()) => HealthStatus::Up,
            Err(_) => HealthStatus::Down,
        }
    }

    pub async fn snapshot(&self) -> HealthInfo {
        let database = self.database_status().await;
        HealthInfo {
            status: database,
            database,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            uptime_seconds: self.uptime(),
        }
    }
}

pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_HASH").unwrap_or("unknown"),
        "built": option_env!("BUILD_TIME").unwrap_or("unknown"),
    }))
}

pub async fn health_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    debug!("Health check endpoint called");
    let health = state.snapshot().await;
    (health.status.status_code(), Json(health))
}

pub async fn readiness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let database = state.database_status().await;
    (
        database.status_code(),
        Json(json!({
            "ready": database == HealthStatus::Up,
            "timestamp": Utc::now(),
        })),
    )
}

pub async fn liveness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "alive": true,
            "uptime_seconds": state.uptime(),
            "timestamp": Utc::now(),
        })),
    )
}

/// Health endpoints carry their own state, so the router fits under any parent.
pub fn health_routes<S>(db_pool: Arc<DatabaseConnection>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
        .route("/version", get(version_info))
        .with_state(Arc::new(HealthState::new(db_pool)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use sea_orm::Database;
    use tower::ServiceExt;

    #[tokio::test]
    async fn ready_when_database_answers() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let app: Router = health_routes(Arc::new(db));

        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn not_ready_once_the_pool_is_closed() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let app: Router = health_routes(Arc::new(db.clone()));
        db.close().await.unwrap();

        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn live_reports_uptime() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let app: Router = health_routes(Arc::new(db));

        let response = app
            .oneshot(Request::get("/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["alive"], true);
    }
}
