use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

mod config;
mod db;
mod error;
mod handlers;
mod models;


use crate::config::{Config, StorageBackend};
use crate::db::{MemoryProductStore, PgProductStore, ProductStore};

/// Shared application state. The store is the one connection handle for the
/// life of the process.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProductStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,warehouse_api=debug")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn ProductStore> = match config.storage {
        StorageBackend::Postgres => Arc::new(connect_postgres(&config.database_url).await?),
        StorageBackend::Memory => {
            info!("Using in-memory product store; data will not survive a restart.");
            Arc::new(MemoryProductStore::new())
        }
    };

    let app = build_router(AppState { store });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// A bad URL is fatal. An unreachable database is logged once and the
/// server starts anyway; requests then fail with the pool's error.
async fn connect_postgres(database_url: &str) -> anyhow::Result<PgProductStore> {
    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_lazy(database_url)?;

    match sqlx::migrate!("./migrations").run(&pool).await {
        Ok(()) => info!("Database connection established, migrations complete."),
        Err(e) => error!(error = %e, "Database connection failed"),
    }

    Ok(PgProductStore::new(pool))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/api/products/summary",
            get(handlers::products::product_summary)
                .put(handlers::products::update_summary_product)
                .delete(handlers::products::delete_summary_product),
        )
        .route(
            "/api/products/:productId",
            put(handlers::products::update_product).delete(handlers::products::delete_product),
        )
        .fallback(handlers::route_not_found)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
