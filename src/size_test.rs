// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for size module

use super::size::*;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use prometheus::{HistogramOpts, HistogramVec};
use tower::{service_fn, Layer, ServiceExt};

fn histogram(labels: &[&str]) -> HistogramVec {
    HistogramVec::new(HistogramOpts::new("test_size_bytes", "test histogram"), labels).unwrap()
}

async fn test_handler() -> impl IntoResponse {
    (StatusCode::OK, "hello")
}

async fn test_handler_empty() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[test]
fn test_compute_request_size() {
    let request = Request::builder()
        .method("POST")
        .uri("/api?x=1")
        .header(header::HOST, "example.com")
        .header(header::CONTENT_LENGTH, "10")
        .body(())
        .unwrap();

    // "/api?x=1" (10) + {"content-length":"10","host":"example.com"} (44)
    // + "POST" (6) + "http://example.com" (20) + content length (10)
    assert_eq!(compute_request_size(&request), 90);
}

#[test]
fn test_compute_request_size_without_content_length() {
    let request = Request::builder().uri("/").body(()).unwrap();

    // "/" (3) + {} (2) + "GET" (5) + "http://" (9)
    assert_eq!(compute_request_size(&request), 19);
}

#[test]
fn test_compute_request_size_joins_repeated_headers() {
    let request = Request::builder()
        .uri("/")
        .header("accept", "a")
        .header("accept", "b")
        .body(())
        .unwrap();

    // {"accept":"a, b"} is 17 bytes
    assert_eq!(compute_request_size(&request), 3 + 17 + 5 + 9);
}

#[test]
fn test_request_origin() {
    let request = Request::builder()
        .uri("https://api.example.com/items")
        .body(())
        .unwrap();
    assert_eq!(request_origin(&request), "https://api.example.com");

    let request = Request::builder()
        .uri("/items")
        .header(header::HOST, "localhost:8080")
        .body(())
        .unwrap();
    assert_eq!(request_origin(&request), "http://localhost:8080");
}

#[test]
fn test_response_length() {
    let response = Response::new(Body::from("hello"));
    assert_eq!(response_length(&response), Some(5));

    let response = Response::builder()
        .header(header::CONTENT_LENGTH, "42")
        .body(Body::empty())
        .unwrap();
    assert_eq!(response_length(&response), Some(42));

    let response = Response::new(Body::empty());
    assert_eq!(response_length(&response), Some(0));
}

#[tokio::test]
async fn test_response_size_observed() {
    let histogram = histogram(&["code", "method"]);
    let app = Router::new()
        .route("/test", get(test_handler))
        .layer(ResponseSizeLayer::new(histogram.clone()).unwrap());

    let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let observed = histogram.with_label_values(&["200", "GET"]);
    assert_eq!(observed.get_sample_count(), 1);
    assert_eq!(observed.get_sample_sum(), 5.0);
}

#[tokio::test]
async fn test_response_size_skips_empty_body() {
    let histogram = histogram(&["code"]);
    let app = Router::new()
        .route("/empty", get(test_handler_empty))
        .layer(ResponseSizeLayer::new(histogram.clone()).unwrap());

    let request = Request::builder().uri("/empty").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(histogram.with_label_values(&["204"]).get_sample_count(), 0);
}

#[tokio::test]
async fn test_response_size_skips_downstream_error() {
    let histogram = histogram(&["code"]);
    let inner = service_fn(|_req: Request<Body>| async {
        Err::<Response<Body>, &'static str>("downstream failure")
    });
    let service = ResponseSizeLayer::new(histogram.clone())
        .unwrap()
        .layer(inner);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let result = service.oneshot(request).await;

    assert_eq!(result.unwrap_err(), "downstream failure");
    assert_eq!(histogram.with_label_values(&["200"]).get_sample_count(), 0);
}

#[tokio::test]
async fn test_request_size_observed() {
    let histogram = histogram(&["code", "method"]);
    let app = Router::new()
        .route("/echo", post(|body: String| async move { body }))
        .layer(RequestSizeLayer::new(histogram.clone()).unwrap());

    let request = Request::builder()
        .method("POST")
        .uri("/echo")
        .header(header::CONTENT_LENGTH, "5")
        .body(Body::from("hello"))
        .unwrap();
    let expected = compute_request_size(&request);

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let observed = histogram.with_label_values(&["200", "POST"]);
    assert_eq!(observed.get_sample_count(), 1);
    assert_eq!(observed.get_sample_sum(), expected as f64);
}

#[tokio::test]
async fn test_request_size_skips_downstream_error() {
    let histogram = histogram(&[]);
    let inner = service_fn(|_req: Request<Body>| async {
        Err::<Response<Body>, &'static str>("downstream failure")
    });
    let service = RequestSizeLayer::new(histogram.clone())
        .unwrap()
        .layer(inner);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    assert!(service.oneshot(request).await.is_err());

    let no_labels: [&str; 0] = [];
    assert_eq!(histogram.with_label_values(&no_labels).get_sample_count(), 0);
}

#[test]
fn test_size_layers_reject_unsupported_labels() {
    assert!(RequestSizeLayer::new(histogram(&["path"])).is_err());
    assert!(ResponseSizeLayer::new(histogram(&["method"])).is_err());
    assert!(ResponseSizeLayer::new(histogram(&["code"])).is_ok());
}
