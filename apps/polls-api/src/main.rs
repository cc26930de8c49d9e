use axum_helpers::server::{create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::{AppState, Storage};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output
    install_color_eyre();

    // Load configuration from environment variables
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.environment);

    let storage = Storage::connect(&config).await?;
    let state = AppState { config, storage };

    // Build router with API routes
    let api_routes = api::routes(&state);

    // Create a router with OpenAPI docs
    let router = create_router::<openapi::ApiDoc>(
        api_routes,
        &state.config.server,
        &state.config.environment,
    )?;

    // Merge health endpoints
    let app = router.merge(health_router(state.config.app));

    info!(
        storage = %state.config.storage,
        "Starting Polls API with graceful shutdown ({:?} timeout)",
        state.config.server.shutdown_timeout
    );

    let server_config = state.config.server.clone();
    create_production_app(app, &server_config, state.storage.shutdown())
        .await
        .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Polls API shutdown complete");
    Ok(())
}
