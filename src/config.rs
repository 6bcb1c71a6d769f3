// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Metrics configuration

use crate::{metrics::DEFAULT_PREFIX, types::MetricsError};

/// Default path of the scrape endpoint
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Prefix of every default metric name
    pub prefix: String,
    /// Path the scrape endpoint is mounted on
    pub metrics_path: String,
    /// Whether request/response size histograms are recorded
    pub size_metrics: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
            size_metrics: true,
        }
    }
}

impl MetricsConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `METRICS_PREFIX`: Metric name prefix (default: http)
    /// - `METRICS_PATH`: Scrape endpoint path (default: /metrics)
    /// - `METRICS_SIZE_ENABLED`: Record size histograms (default: true)
    pub fn from_env() -> Self {
        let prefix =
            std::env::var("METRICS_PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string());

        let metrics_path =
            std::env::var("METRICS_PATH").unwrap_or_else(|_| DEFAULT_METRICS_PATH.to_string());

        let size_metrics = std::env::var("METRICS_SIZE_ENABLED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);

        Self {
            prefix,
            metrics_path,
            size_metrics,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), MetricsError> {
        if !is_valid_prefix(&self.prefix) {
            return Err(MetricsError::InvalidConfig(format!(
                "prefix must match [a-zA-Z_:][a-zA-Z0-9_:]*, got {:?}",
                self.prefix
            )));
        }

        if !self.metrics_path.starts_with('/') {
            return Err(MetricsError::InvalidConfig(format!(
                "metrics_path must start with '/', got {:?}",
                self.metrics_path
            )));
        }

        Ok(())
    }
}

fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
