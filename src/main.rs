mod api;
mod auth;
mod builder;
mod codes;
mod config;
mod errors;
mod fixer;
mod import;
mod models;
mod registry;
mod store;
mod validate;

use std::{env, path::PathBuf, sync::Arc};

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use config::Config;
use store::LocationStore;
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<Mutex<LocationStore>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "katottg_locations_api=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.api_key_is_fallback {
        warn!("Running with a generated API key; set KATOTTG_API_KEY for real deployments");
    }
    let mut store = LocationStore::open(&config.db_path)?;

    // `katottg-locations-api import [csv_path]` runs the offline batch
    // refresh and exits; the server itself never triggers imports.
    let mut args = env::args().skip(1);
    if let Some(command) = args.next() {
        if command == "import" {
            let csv_path = args
                .next()
                .map(PathBuf::from)
                .unwrap_or_else(|| config.katottg_csv_path.clone());
            let summary = import::run_import(&mut store, &csv_path)?;
            info!(
                rows = summary.rows,
                locations = summary.upserted,
                pruned = summary.deleted,
                "KATOTTG import finished"
            );
            return Ok(());
        }
        anyhow::bail!("Unknown command: {command}");
    }

    let state = AppState {
        config: config.clone(),
        store: Arc::new(Mutex::new(store)),
    };

    let app = Router::new()
        .route("/healthz", get(api::healthz))
        .route("/v1/locations/search", get(api::search_locations))
        .route("/v1/locations/whole-country", get(api::whole_country))
        .route(
            "/v1/locations/preferences/validate",
            post(api::validate_preferences),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("katottg-locations-api listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
