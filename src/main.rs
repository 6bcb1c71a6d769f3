// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Instrumented demo server
//!
//! A lightweight HTTP server showing the promhttp layers in place:
//! - Default request count, duration and in-flight metrics
//! - Request and response size histograms (optional)
//! - A Prometheus scrape endpoint

use anyhow::Context;
use axum::{
    routing::{get, post},
    Json, Router,
};
use prometheus::Registry;
use serde::Serialize;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{info, warn};

use promhttp::{
    config::MetricsConfig,
    metrics::{self, HttpSizeMetrics},
};

/// Server configuration
const DEFAULT_API_PORT: u16 = 8080;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Echo endpoint, useful for exercising the size histograms
async fn echo(body: String) -> String {
    body
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("starting promhttp demo server v{}", env!("CARGO_PKG_VERSION"));

    // get configuration from environment
    let config = MetricsConfig::from_env();
    config.validate().context("invalid metrics configuration")?;

    let api_port = std::env::var("API_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_API_PORT);

    info!("metrics prefix: {}", config.prefix);
    info!("metrics path: {}", config.metrics_path);
    info!("api port: {}", api_port);

    // every metric lives in this registry; nothing is registered globally
    let registry = Registry::new();
    let http_metrics = metrics::default_http_metrics_injector(&registry, &config.prefix)
        .context("failed to register http metrics")?;

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/echo", post(echo));

    let api_routes = if config.size_metrics {
        let sizes = HttpSizeMetrics::new(&config.prefix)?;
        sizes
            .register(&registry)
            .context("failed to register size metrics")?;
        api_routes
            .layer(sizes.response_layer()?)
            .layer(sizes.request_layer()?)
    } else {
        warn!("request/response size metrics are disabled");
        api_routes
    };

    // build main router; the scrape endpoint is not instrumented itself
    let app = Router::new()
        .nest("/api/v1", api_routes)
        .layer(http_metrics)
        .route(&config.metrics_path, metrics::metrics_handler(registry))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http());

    // start server
    let addr = format!("0.0.0.0:{}", api_port);

    info!("promhttp demo server listening on {}", addr);
    info!("metrics available at http://{}{}", addr, config.metrics_path);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}
