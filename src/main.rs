// src/main.rs
use anyhow::Context;
use axum::{http::HeaderValue, routing::get, Router};
use dotenvy::dotenv;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use luxx_inventory::{config::Config, database, logging, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    logging::init_tracing("luxx_inventory=info,tower_http=info")?;

    let config = Config::from_env()?;

    // Create database pool and bring the schema up to date
    let db_pool = database::create_pool(&config)
        .await
        .context("failed to create database pool")?;
    database::run_migrations(&db_pool)
        .await
        .context("failed to apply database migrations")?;

    // Create application state
    let app_state = AppState::new(db_pool);

    let origin: HeaderValue = config
        .cors_origin
        .parse()
        .with_context(|| format!("invalid CORS_ORIGIN {:?}", config.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build application under /api base path
    let app = Router::new()
        .nest("/api", routes::create_router())
        .route("/", get(|| async { "Luxx Inventory API" }))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(app_state);

    let addr = SocketAddr::from((config.host, config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Server running on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
