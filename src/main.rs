/// Flight cost service entry point
mod config;
mod domain;
mod errors;
mod handlers;
mod repo;
mod routes;
mod services;
mod track;
mod utils;

use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::repo::CatalogRepo;
use crate::routes::build_router;
use crate::services::CostService;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Configuration loaded successfully");

    // Load catalogs
    let repo = CatalogRepo::load(&config.catalog_path).await?;
    let overrides = config.cost_overrides.clone();
    repo.update(|catalogs| {
        if let Some(price) = overrides.fuel_price_per_liter {
            catalogs.globals.fuel_price_per_liter = price;
        }
        if let Some(charge) = overrides.navigation_charge_per_km {
            catalogs.globals.navigation_charge_per_km = charge;
        }
    })
    .await;
    info!(globals = ?repo.snapshot().await.globals, "Cost parameters in effect");

    // Initialize application state
    let state = AppState {
        cost_service: Arc::new(CostService::new(repo)),
    };

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("flight_cost service listening on {}", config.bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
