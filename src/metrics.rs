// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus exposition and default HTTP metrics
//!
//! This module provides:
//! - Text exposition of a caller-owned [`Registry`]
//! - The default request metrics (count, duration, in-flight) and their composition
//! - Request/response size histograms for the size layers

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
};
use prometheus::{
    exponential_buckets, CounterVec, Encoder, HistogramOpts, HistogramVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use tower::Layer;
use tracing::{error, info};

use crate::{
    labels::{CODE_LABEL, METHOD_LABEL},
    middleware::{
        CountLayer, CountService, DurationLayer, DurationService, InFlightLayer, InFlightService,
    },
    size::{RequestSizeLayer, ResponseSizeLayer},
    types::MetricsError,
};

/// Default metric name prefix
pub const DEFAULT_PREFIX: &str = "http";

/// Request duration buckets in seconds
pub const DURATION_BUCKETS: [f64; 8] = [0.1, 0.2, 0.3, 0.4, 0.5, 1.0, 2.0, 5.0];

/// Generate metrics output in Prometheus text format
pub fn gather_metrics(registry: &Registry) -> Result<String, MetricsError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
}

/// Metrics endpoint for Prometheus scraping
///
/// Always answers 200. An encoding failure is logged and answered with an
/// empty body.
pub async fn serve_metrics(State(registry): State<Registry>) -> Response {
    let body = gather_metrics(&registry).unwrap_or_else(|e| {
        error!("failed to gather metrics: {}", e);
        String::new()
    });

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        body,
    )
        .into_response()
}

/// GET route exposing `registry`, mountable on any router
pub fn metrics_handler<S>(registry: Registry) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    get(serve_metrics).with_state(registry)
}

/// Default request metrics: total count, duration and in-flight gauge
#[derive(Clone)]
pub struct HttpMetrics {
    pub request_total: CounterVec,
    pub request_duration_seconds: HistogramVec,
    pub request_in_flight: IntGauge,
}

impl HttpMetrics {
    /// Build `<prefix>_request_total`, `<prefix>_request_duration_seconds`
    /// and `<prefix>_request_in_flight`
    pub fn new(prefix: &str) -> Result<Self, MetricsError> {
        let request_total = CounterVec::new(
            Opts::new(
                format!("{}_request_total", prefix),
                "Total number of HTTP requests",
            ),
            &[CODE_LABEL],
        )?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                format!("{}_request_duration_seconds", prefix),
                "Duration of HTTP requests in seconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &[CODE_LABEL],
        )?;

        let request_in_flight = IntGauge::new(
            format!("{}_request_in_flight", prefix),
            "Number of current processing HTTP requests",
        )?;

        Ok(Self {
            request_total,
            request_duration_seconds,
            request_in_flight,
        })
    }

    /// Register all three metrics with `registry`
    pub fn register(&self, registry: &Registry) -> Result<(), MetricsError> {
        registry.register(Box::new(self.request_total.clone()))?;
        registry.register(Box::new(self.request_duration_seconds.clone()))?;
        registry.register(Box::new(self.request_in_flight.clone()))?;
        Ok(())
    }

    /// Compose the layers for these metrics
    pub fn layer(&self) -> Result<MetricsLayer, MetricsError> {
        metrics_injector(
            self.request_duration_seconds.clone(),
            self.request_total.clone(),
            self.request_in_flight.clone(),
        )
    }
}

/// Duration, count and in-flight instrumentation as one layer.
///
/// Wraps as `duration(count(in_flight(inner)))`, so the in-flight gauge is
/// decremented before count and duration are recorded.
#[derive(Clone)]
pub struct MetricsLayer {
    duration: DurationLayer,
    count: CountLayer,
    in_flight: InFlightLayer,
}

impl<S> Layer<S> for MetricsLayer {
    type Service = DurationService<CountService<InFlightService<S>>>;

    fn layer(&self, inner: S) -> Self::Service {
        self.duration
            .layer(self.count.layer(self.in_flight.layer(inner)))
    }
}

/// Compose caller-supplied metrics into a single [`MetricsLayer`]
pub fn metrics_injector(
    request_duration_seconds: HistogramVec,
    request_total: CounterVec,
    request_in_flight: IntGauge,
) -> Result<MetricsLayer, MetricsError> {
    Ok(MetricsLayer {
        duration: DurationLayer::new(request_duration_seconds)?,
        count: CountLayer::new(request_total)?,
        in_flight: InFlightLayer::new(request_in_flight),
    })
}

/// Build, register and compose the default metrics under `prefix`
pub fn default_http_metrics_injector(
    registry: &Registry,
    prefix: &str,
) -> Result<MetricsLayer, MetricsError> {
    let metrics = HttpMetrics::new(prefix)?;
    metrics.register(registry)?;
    info!("registered default http metrics with prefix {}", prefix);
    metrics.layer()
}

/// Request and response size histograms, partitioned by code and method
#[derive(Clone)]
pub struct HttpSizeMetrics {
    pub request_size_bytes: HistogramVec,
    pub response_size_bytes: HistogramVec,
}

impl HttpSizeMetrics {
    /// Build `<prefix>_request_size_bytes` and `<prefix>_response_size_bytes`
    pub fn new(prefix: &str) -> Result<Self, MetricsError> {
        let buckets = exponential_buckets(64.0, 4.0, 8)?;

        let request_size_bytes = HistogramVec::new(
            HistogramOpts::new(
                format!("{}_request_size_bytes", prefix),
                "Estimated size of HTTP requests in bytes",
            )
            .buckets(buckets.clone()),
            &[CODE_LABEL, METHOD_LABEL],
        )?;

        let response_size_bytes = HistogramVec::new(
            HistogramOpts::new(
                format!("{}_response_size_bytes", prefix),
                "Size of HTTP responses in bytes",
            )
            .buckets(buckets),
            &[CODE_LABEL, METHOD_LABEL],
        )?;

        Ok(Self {
            request_size_bytes,
            response_size_bytes,
        })
    }

    /// Register both histograms with `registry`
    pub fn register(&self, registry: &Registry) -> Result<(), MetricsError> {
        registry.register(Box::new(self.request_size_bytes.clone()))?;
        registry.register(Box::new(self.response_size_bytes.clone()))?;
        info!("registered http size metrics");
        Ok(())
    }

    pub fn request_layer(&self) -> Result<RequestSizeLayer, MetricsError> {
        RequestSizeLayer::new(self.request_size_bytes.clone())
    }

    pub fn response_layer(&self) -> Result<ResponseSizeLayer, MetricsError> {
        ResponseSizeLayer::new(self.response_size_bytes.clone())
    }
}
