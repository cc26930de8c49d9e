//! Readiness endpoint

use axum::{Router, extract::State, response::IntoResponse, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use database::mongodb::check_health_detailed;

use crate::state::{AppState, Storage};

/// Create a readiness router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(readiness_check))
        .with_state(state)
}

/// Readiness check - verifies the storage backend answers
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let check: HealthCheckFuture<'_> = match &state.storage {
        Storage::Mongo { client, .. } => Box::pin(async move {
            let status = check_health_detailed(client).await;
            if status.healthy {
                Ok(())
            } else {
                Err(status.message.unwrap_or_else(|| "ping failed".to_string()))
            }
        }),
        Storage::Memory { .. } => Box::pin(async { Ok(()) }),
    };
    let name = match state.storage {
        Storage::Mongo { .. } => "mongodb",
        Storage::Memory { .. } => "memory",
    };

    run_health_checks(vec![(name, check)]).await
}
