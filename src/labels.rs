// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label inspection and extraction for request metrics
//!
//! A metric may declare zero, one, or two variable labels, and the only names
//! allowed are `code` and `method`. The presence of `code` gates labelling:
//! a metric without it is always recorded unpartitioned.

use axum::http::{Method, StatusCode};
use prometheus::core::Collector;
use std::collections::HashMap;

use crate::types::MetricsError;

/// Label name for the HTTP status code
pub const CODE_LABEL: &str = "code";

/// Label name for the HTTP request method
pub const METHOD_LABEL: &str = "method";

/// Which request attributes a metric is partitioned by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelPolicy {
    pub has_code: bool,
    pub has_method: bool,
}

/// Membership check of `code` and `method` in a label-name set
pub fn check_labels<S: AsRef<str>>(label_names: &[S]) -> LabelPolicy {
    LabelPolicy {
        has_code: label_names.iter().any(|n| n.as_ref() == CODE_LABEL),
        has_method: label_names.iter().any(|n| n.as_ref() == METHOD_LABEL),
    }
}

/// Variable label names declared by a metric
pub fn declared_label_names<C: Collector>(metric: &C) -> Vec<String> {
    metric
        .desc()
        .into_iter()
        .flat_map(|desc| desc.variable_labels.iter().cloned())
        .collect()
}

impl LabelPolicy {
    /// Validate a label-name set and derive its policy.
    ///
    /// # Errors
    /// - a name other than `code` or `method`
    /// - a name declared twice
    /// - `method` declared without `code`
    pub fn validate<S: AsRef<str>>(label_names: &[S]) -> Result<Self, MetricsError> {
        let mut seen: Vec<&str> = Vec::with_capacity(label_names.len());

        for name in label_names.iter().map(AsRef::as_ref) {
            if name != CODE_LABEL && name != METHOD_LABEL {
                return Err(MetricsError::UnsupportedLabel(name.to_string()));
            }
            if seen.contains(&name) {
                return Err(MetricsError::DuplicateLabel(name.to_string()));
            }
            seen.push(name);
        }

        let policy = check_labels(label_names);
        if policy.has_method && !policy.has_code {
            return Err(MetricsError::MethodWithoutCode);
        }

        Ok(policy)
    }

    /// Validate the label names declared by a registry metric
    pub fn for_metric<C: Collector>(metric: &C) -> Result<Self, MetricsError> {
        Self::validate(&declared_label_names(metric))
    }

    /// Label values for one observation.
    ///
    /// An unset status is reported as 200.
    pub fn labels(&self, status: Option<StatusCode>, method: &Method) -> RequestLabels {
        if !self.has_code {
            return RequestLabels::default();
        }

        let code = status.unwrap_or(StatusCode::OK).as_u16().to_string();
        let method = self.has_method.then(|| method.as_str().to_string());

        RequestLabels {
            code: Some(code),
            method,
        }
    }
}

/// Compute label values for a request against a label-name set
pub fn request_labels<S: AsRef<str>>(
    status: Option<StatusCode>,
    method: &Method,
    label_names: &[S],
) -> RequestLabels {
    check_labels(label_names).labels(status, method)
}

/// Concrete label values attached to a single observation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLabels {
    code: Option<String>,
    method: Option<String>,
}

impl RequestLabels {
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.method.is_none()
    }

    pub fn len(&self) -> usize {
        usize::from(self.code.is_some()) + usize::from(self.method.is_some())
    }

    /// Label map in the shape expected by `MetricVec::get_metric_with`
    pub fn as_map(&self) -> HashMap<&str, &str> {
        let mut map = HashMap::with_capacity(self.len());
        if let Some(code) = &self.code {
            map.insert(CODE_LABEL, code.as_str());
        }
        if let Some(method) = &self.method {
            map.insert(METHOD_LABEL, method.as_str());
        }
        map
    }
}
