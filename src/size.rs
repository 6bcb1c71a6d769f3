// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Request and response size instrumentation
//!
//! Unlike the layers in [`crate::middleware`], these only record once the
//! wrapped service has returned a response. An error, panic or cancellation
//! skips the observation; the error itself is still returned unchanged.

use axum::{
    body::HttpBody,
    http::{header, HeaderMap, Request, Response},
};
use prometheus::HistogramVec;
use serde_json::{Map, Value};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::{labels::LabelPolicy, middleware::BoxFuture, types::MetricsError};

/// Length of a string once JSON-encoded, quotes included
fn json_len(value: &str) -> usize {
    serde_json::to_string(value).map(|s| s.len()).unwrap_or(0)
}

/// Headers as a JSON object; repeated values are joined with ", "
fn headers_json(headers: &HeaderMap) -> Value {
    let mut object = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        object.insert(name.as_str().to_string(), Value::String(joined));
    }
    Value::Object(object)
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// `<scheme>://<host>` for a request, defaulting the scheme to `http`
pub fn request_origin<B>(req: &Request<B>) -> String {
    let scheme = req.uri().scheme_str().unwrap_or("http");
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default();
    format!("{}://{}", scheme, host)
}

/// Estimated request size in bytes.
///
/// Sum of the JSON-encoded lengths of the URI, the header object, the method
/// and the origin, plus the declared `Content-Length` (0 when absent). This is
/// a heuristic, not the size of the request on the wire.
pub fn compute_request_size<B>(req: &Request<B>) -> u64 {
    let headers = serde_json::to_string(&headers_json(req.headers()))
        .map(|s| s.len())
        .unwrap_or(0);

    let estimated = json_len(&req.uri().to_string())
        + headers
        + json_len(req.method().as_str())
        + json_len(&request_origin(req));

    estimated as u64 + content_length(req.headers()).unwrap_or(0)
}

/// Response length from `Content-Length`, else the body's exact size hint
pub fn response_length<B: HttpBody>(response: &Response<B>) -> Option<u64> {
    content_length(response.headers()).or_else(|| response.body().size_hint().exact())
}

// ---------------------------------------------------------------------------
// Request size
// ---------------------------------------------------------------------------

/// Layer that observes the estimated request size after a successful response
#[derive(Clone)]
pub struct RequestSizeLayer {
    histogram: HistogramVec,
    policy: LabelPolicy,
}

impl RequestSizeLayer {
    /// Validates the histogram's label names up front
    pub fn new(histogram: HistogramVec) -> Result<Self, MetricsError> {
        let policy = LabelPolicy::for_metric(&histogram)?;
        debug!(
            "instrumenting request size (code: {}, method: {})",
            policy.has_code, policy.has_method
        );
        Ok(Self { histogram, policy })
    }
}

impl<S> Layer<S> for RequestSizeLayer {
    type Service = RequestSizeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestSizeService {
            inner,
            histogram: self.histogram.clone(),
            policy: self.policy,
        }
    }
}

#[derive(Clone)]
pub struct RequestSizeService<S> {
    inner: S,
    histogram: HistogramVec,
    policy: LabelPolicy,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestSizeService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: 'static,
    ReqBody: 'static,
    ResBody: 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let size = compute_request_size(&req);
        let method = req.method().clone();
        let histogram = self.histogram.clone();
        let policy = self.policy;
        let future = self.inner.call(req);

        Box::pin(async move {
            let response = future.await?;

            let labels = policy.labels(Some(response.status()), &method);
            match histogram.get_metric_with(&labels.as_map()) {
                Ok(observer) => observer.observe(size as f64),
                Err(e) => warn!("failed to record request size: {}", e),
            }

            Ok::<_, S::Error>(response)
        })
    }
}

// ---------------------------------------------------------------------------
// Response size
// ---------------------------------------------------------------------------

/// Layer that observes the response length after a successful response.
///
/// Responses with no known length, or a length of zero, are not observed.
#[derive(Clone)]
pub struct ResponseSizeLayer {
    histogram: HistogramVec,
    policy: LabelPolicy,
}

impl ResponseSizeLayer {
    /// Validates the histogram's label names up front
    pub fn new(histogram: HistogramVec) -> Result<Self, MetricsError> {
        let policy = LabelPolicy::for_metric(&histogram)?;
        debug!(
            "instrumenting response size (code: {}, method: {})",
            policy.has_code, policy.has_method
        );
        Ok(Self { histogram, policy })
    }
}

impl<S> Layer<S> for ResponseSizeLayer {
    type Service = ResponseSizeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponseSizeService {
            inner,
            histogram: self.histogram.clone(),
            policy: self.policy,
        }
    }
}

#[derive(Clone)]
pub struct ResponseSizeService<S> {
    inner: S,
    histogram: HistogramVec,
    policy: LabelPolicy,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ResponseSizeService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: 'static,
    ReqBody: 'static,
    ResBody: HttpBody + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let method = req.method().clone();
        let histogram = self.histogram.clone();
        let policy = self.policy;
        let future = self.inner.call(req);

        Box::pin(async move {
            let response = future.await?;

            if let Some(length) = response_length(&response).filter(|len| *len > 0) {
                let labels = policy.labels(Some(response.status()), &method);
                match histogram.get_metric_with(&labels.as_map()) {
                    Ok(observer) => observer.observe(length as f64),
                    Err(e) => warn!("failed to record response size: {}", e),
                }
            }

            Ok::<_, S::Error>(response)
        })
    }
}
