//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::notification::DispatcherStatsSnapshot;
use crate::resilience::CircuitState;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub storage: StorageHealthResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresHealthResponse>,
    pub templates: TemplateHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct StorageHealthResponse {
    pub configured: String,
    pub settings_backend: String,
    pub feed_backend: String,
}

#[derive(Debug, Serialize)]
pub struct PostgresHealthResponse {
    pub connected: bool,
    pub circuit_state: CircuitState,
    pub pool_size: u32,
    pub idle_connections: u32,
}

#[derive(Debug, Serialize)]
pub struct TemplateHealthResponse {
    pub registered: usize,
    pub strict: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub dispatch: DispatcherStatsSnapshot,
    pub templates: usize,
    pub redis_trigger_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_circuit: Option<CircuitStats>,
}

#[derive(Debug, Serialize)]
pub struct CircuitStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let postgres = state.postgres.as_ref().map(|pool| {
        let inner_pool = pool.pool();
        PostgresHealthResponse {
            connected: pool.is_available(),
            circuit_state: pool.circuit_breaker().state(),
            pool_size: inner_pool.size(),
            idle_connections: inner_pool.num_idle() as u32,
        }
    });

    // An open storage circuit means dispatches fail fast
    let healthy = postgres.as_ref().map_or(true, |pg| pg.connected);
    let status = if healthy { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        storage: StorageHealthResponse {
            configured: state.settings.storage.backend.clone(),
            settings_backend: state.settings_store.backend_type().to_string(),
            feed_backend: state.feed.backend_type().to_string(),
        },
        postgres,
        templates: TemplateHealthResponse {
            registered: state.template_store.count(),
            strict: state.settings.templates.strict,
        },
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let storage_circuit = state.postgres.as_ref().map(|pool| {
        let cb = pool.circuit_breaker().stats();
        CircuitStats {
            state: cb.state,
            failure_count: cb.failure_count,
            success_count: cb.success_count,
        }
    });

    Json(StatsResponse {
        dispatch: state.dispatcher.stats(),
        templates: state.template_store.count(),
        redis_trigger_enabled: state.settings.redis.enabled,
        storage_circuit,
    })
}
