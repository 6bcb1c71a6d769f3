// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for labels module

use super::labels::*;
use crate::types::MetricsError;
use axum::http::{Method, StatusCode};
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts};

const NO_LABELS: [&str; 0] = [];

#[test]
fn test_check_labels_membership() {
    assert_eq!(check_labels(&NO_LABELS), LabelPolicy::default());
    assert_eq!(
        check_labels(&["code"]),
        LabelPolicy {
            has_code: true,
            has_method: false
        }
    );
    assert_eq!(
        check_labels(&["method"]),
        LabelPolicy {
            has_code: false,
            has_method: true
        }
    );
    assert_eq!(
        check_labels(&["method", "code"]),
        LabelPolicy {
            has_code: true,
            has_method: true
        }
    );
}

#[test]
fn test_check_labels_ignores_unknown_names() {
    let policy = check_labels(&["path", "status"]);
    assert!(!policy.has_code);
    assert!(!policy.has_method);
}

#[test]
fn test_validate_accepts_supported_sets() {
    assert!(LabelPolicy::validate(&NO_LABELS).is_ok());
    assert!(LabelPolicy::validate(&["code"]).is_ok());
    assert!(LabelPolicy::validate(&["code", "method"]).is_ok());
    assert!(LabelPolicy::validate(&["method", "code"]).is_ok());
}

#[test]
fn test_validate_rejects_unknown_label() {
    let err = LabelPolicy::validate(&["code", "path"]).unwrap_err();
    assert!(matches!(err, MetricsError::UnsupportedLabel(ref name) if name == "path"));
}

#[test]
fn test_validate_rejects_duplicate_label() {
    let err = LabelPolicy::validate(&["code", "code"]).unwrap_err();
    assert!(matches!(err, MetricsError::DuplicateLabel(ref name) if name == "code"));
}

#[test]
fn test_validate_rejects_method_without_code() {
    let err = LabelPolicy::validate(&["method"]).unwrap_err();
    assert!(matches!(err, MetricsError::MethodWithoutCode));
}

#[test]
fn test_request_labels_without_code_are_empty() {
    let statuses = [None, Some(StatusCode::OK), Some(StatusCode::NOT_FOUND)];
    let methods = [Method::GET, Method::POST, Method::DELETE];
    let label_sets: [&[&str]; 3] = [&[], &["method"], &["path"]];

    for status in statuses {
        for method in &methods {
            for names in label_sets {
                let labels = request_labels(status, method, names);
                assert!(labels.is_empty());
                assert!(labels.as_map().is_empty());
            }
        }
    }
}

#[test]
fn test_request_labels_code_only() {
    let labels = request_labels(Some(StatusCode::NOT_FOUND), &Method::GET, &["code"]);
    assert_eq!(labels.code(), Some("404"));
    assert_eq!(labels.method(), None);
    assert_eq!(labels.len(), 1);
}

#[test]
fn test_request_labels_default_status() {
    let labels = request_labels(None, &Method::POST, &["code"]);
    assert_eq!(labels.code(), Some("200"));
}

#[test]
fn test_request_labels_code_and_method() {
    let labels = request_labels(
        Some(StatusCode::INTERNAL_SERVER_ERROR),
        &Method::PUT,
        &["code", "method"],
    );
    assert_eq!(labels.code(), Some("500"));
    assert_eq!(labels.method(), Some("PUT"));

    let map = labels.as_map();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get("code"), Some(&"500"));
    assert_eq!(map.get("method"), Some(&"PUT"));
}

#[test]
fn test_request_labels_code_and_method_default_status() {
    let labels = request_labels(None, &Method::GET, &["method", "code"]);
    assert_eq!(labels.code(), Some("200"));
    assert_eq!(labels.method(), Some("GET"));
}

#[test]
fn test_policy_for_counter() {
    let counter = CounterVec::new(Opts::new("test_total", "test"), &["code", "method"]).unwrap();
    assert_eq!(declared_label_names(&counter), vec!["code", "method"]);

    let policy = LabelPolicy::for_metric(&counter).unwrap();
    assert!(policy.has_code);
    assert!(policy.has_method);
}

#[test]
fn test_policy_for_unlabelled_histogram() {
    let histogram =
        HistogramVec::new(HistogramOpts::new("test_seconds", "test"), &[]).unwrap();
    let policy = LabelPolicy::for_metric(&histogram).unwrap();
    assert_eq!(policy, LabelPolicy::default());
}

#[test]
fn test_policy_for_metric_with_unsupported_label() {
    let counter = CounterVec::new(Opts::new("test_total", "test"), &["path"]).unwrap();
    let err = LabelPolicy::for_metric(&counter).unwrap_err();
    assert!(err.is_label_error());
}
