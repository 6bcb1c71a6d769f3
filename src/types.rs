// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common types and errors used throughout the promhttp library

/// Metrics configuration and recording error type
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Unsupported label name: {0} (allowed: \"code\", \"method\")")]
    UnsupportedLabel(String),

    #[error("Duplicate label name: {0}")]
    DuplicateLabel(String),

    #[error("Label \"method\" requires label \"code\" to be declared as well")]
    MethodWithoutCode,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Failed to encode metrics: {0}")]
    Encoding(String),
}

impl MetricsError {
    /// Whether this error was raised by label-set validation
    pub fn is_label_error(&self) -> bool {
        matches!(
            self,
            MetricsError::UnsupportedLabel(_)
                | MetricsError::DuplicateLabel(_)
                | MetricsError::MethodWithoutCode
        )
    }
}
