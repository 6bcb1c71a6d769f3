// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! promhttp - Prometheus request instrumentation for axum and tower
//!
//! A small set of tower layers that attach request-scoped metrics to an HTTP
//! pipeline, plus a scrape endpoint for a caller-owned registry.
//!
//! # Features
//!
//! - Request count, duration and in-flight layers that record on every
//!   outcome (response, error, panic, cancellation)
//! - Request and response size layers that record on success only
//! - Partitioning by HTTP status code and/or method, driven by the label
//!   names each metric declares (`code`, `method`)
//! - Label sets validated when a layer is built, not when a request arrives
//! - A default injector wiring `<prefix>_request_total`,
//!   `<prefix>_request_duration_seconds` and `<prefix>_request_in_flight`
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use prometheus::Registry;
//! use promhttp::{default_http_metrics_injector, metrics_handler};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = Registry::new();
//!     let metrics = default_http_metrics_injector(&registry, "http")?;
//!
//!     let app = Router::new()
//!         .route("/", get(|| async { "hello" }))
//!         .layer(metrics)
//!         .route("/metrics", metrics_handler(registry));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Custom metrics
//!
//! ```rust
//! use prometheus::{CounterVec, Opts, Registry};
//! use promhttp::CountLayer;
//!
//! let registry = Registry::new();
//! let counter = CounterVec::new(
//!     Opts::new("api_requests_total", "API requests"),
//!     &["code", "method"],
//! )
//! .unwrap();
//! registry.register(Box::new(counter.clone())).unwrap();
//!
//! let _layer = CountLayer::new(counter).unwrap();
//!
//! // Anything other than "code" and "method" is rejected up front
//! let bad = CounterVec::new(Opts::new("bad_total", "bad"), &["path"]).unwrap();
//! assert!(CountLayer::new(bad).is_err());
//! ```

// Re-export public modules
pub mod config;
pub mod labels;
pub mod metrics;
pub mod middleware;
pub mod size;
pub mod types;

// Re-export commonly used types

// Error types
pub use types::MetricsError;

// Configuration
pub use config::MetricsConfig;

// Label handling
pub use labels::{
    check_labels, request_labels, LabelPolicy, RequestLabels, CODE_LABEL, METHOD_LABEL,
};

// Layers
pub use middleware::{CountLayer, DurationLayer, InFlightLayer};
pub use size::{compute_request_size, RequestSizeLayer, ResponseSizeLayer};

// Exposition and default metrics
pub use metrics::{
    default_http_metrics_injector, gather_metrics, metrics_handler, metrics_injector,
    HttpMetrics, HttpSizeMetrics, MetricsLayer,
};

#[cfg(test)]
mod labels_test;
#[cfg(test)]
mod size_test;
