// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Request instrumentation layers that always record
//!
//! The count, duration and in-flight layers record exactly once per request,
//! whether the wrapped service returns a response, returns an error, panics,
//! or has its future dropped. Errors from the wrapped service are returned
//! unchanged after recording.

use axum::http::{Method, Request, Response, StatusCode};
use prometheus::{CounterVec, HistogramVec, IntGauge};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::{labels::LabelPolicy, types::MetricsError};

/// Boxed response future used by the instrumentation services
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A single observation taken when a request finishes
trait Recorder: Send + 'static {
    fn record(self, status: Option<StatusCode>);
}

/// Runs its recorder when dropped, with whatever status was seen by then
struct AlwaysRun<R: Recorder> {
    recorder: Option<R>,
    status: Option<StatusCode>,
}

impl<R: Recorder> AlwaysRun<R> {
    fn new(recorder: R) -> Self {
        Self {
            recorder: Some(recorder),
            status: None,
        }
    }

    fn observe_result<B, E>(&mut self, result: &Result<Response<B>, E>) {
        if let Ok(response) = result {
            self.status = Some(response.status());
        }
    }
}

impl<R: Recorder> Drop for AlwaysRun<R> {
    fn drop(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            recorder.record(self.status);
        }
    }
}

/// Await the wrapped future, then let the guard record on the way out
fn always_run<F, R, B, E>(
    future: F,
    mut guard: AlwaysRun<R>,
) -> BoxFuture<Result<Response<B>, E>>
where
    F: Future<Output = Result<Response<B>, E>> + Send + 'static,
    R: Recorder,
    B: 'static,
    E: 'static,
{
    Box::pin(async move {
        let result = future.await;
        guard.observe_result(&result);
        result
    })
}

// ---------------------------------------------------------------------------
// Count
// ---------------------------------------------------------------------------

struct CountRecorder {
    counter: CounterVec,
    policy: LabelPolicy,
    method: Method,
}

impl Recorder for CountRecorder {
    fn record(self, status: Option<StatusCode>) {
        let labels = self.policy.labels(status, &self.method);
        match self.counter.get_metric_with(&labels.as_map()) {
            Ok(counter) => counter.inc(),
            Err(e) => warn!("failed to record request count: {}", e),
        }
    }
}

/// Layer that increments a counter once per request
#[derive(Clone)]
pub struct CountLayer {
    counter: CounterVec,
    policy: LabelPolicy,
}

impl CountLayer {
    /// Validates the counter's label names up front
    pub fn new(counter: CounterVec) -> Result<Self, MetricsError> {
        let policy = LabelPolicy::for_metric(&counter)?;
        debug!(
            "instrumenting request count (code: {}, method: {})",
            policy.has_code, policy.has_method
        );
        Ok(Self { counter, policy })
    }
}

impl<S> Layer<S> for CountLayer {
    type Service = CountService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CountService {
            inner,
            counter: self.counter.clone(),
            policy: self.policy,
        }
    }
}

#[derive(Clone)]
pub struct CountService<S> {
    inner: S,
    counter: CounterVec,
    policy: LabelPolicy,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CountService<S>
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
        let guard = AlwaysRun::new(CountRecorder {
            counter: self.counter.clone(),
            policy: self.policy,
            method: req.method().clone(),
        });
        always_run(self.inner.call(req), guard)
    }
}

// ---------------------------------------------------------------------------
// Duration
// ---------------------------------------------------------------------------

struct DurationRecorder {
    histogram: HistogramVec,
    policy: LabelPolicy,
    method: Method,
    start: Instant,
}

impl Recorder for DurationRecorder {
    fn record(self, status: Option<StatusCode>) {
        let elapsed = self.start.elapsed().as_secs_f64();
        let labels = self.policy.labels(status, &self.method);
        match self.histogram.get_metric_with(&labels.as_map()) {
            Ok(histogram) => histogram.observe(elapsed),
            Err(e) => warn!("failed to record request duration: {}", e),
        }
    }
}

/// Layer that observes wall-clock request duration in seconds
#[derive(Clone)]
pub struct DurationLayer {
    histogram: HistogramVec,
    policy: LabelPolicy,
}

impl DurationLayer {
    /// Validates the histogram's label names up front
    pub fn new(histogram: HistogramVec) -> Result<Self, MetricsError> {
        let policy = LabelPolicy::for_metric(&histogram)?;
        debug!(
            "instrumenting request duration (code: {}, method: {})",
            policy.has_code, policy.has_method
        );
        Ok(Self { histogram, policy })
    }
}

impl<S> Layer<S> for DurationLayer {
    type Service = DurationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DurationService {
            inner,
            histogram: self.histogram.clone(),
            policy: self.policy,
        }
    }
}

#[derive(Clone)]
pub struct DurationService<S> {
    inner: S,
    histogram: HistogramVec,
    policy: LabelPolicy,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for DurationService<S>
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
        let method = req.method().clone();
        let guard = AlwaysRun::new(DurationRecorder {
            histogram: self.histogram.clone(),
            policy: self.policy,
            method,
            start: Instant::now(),
        });
        always_run(self.inner.call(req), guard)
    }
}

// ---------------------------------------------------------------------------
// In-flight
// ---------------------------------------------------------------------------

struct InFlightRecorder {
    gauge: IntGauge,
}

impl Recorder for InFlightRecorder {
    fn record(self, _status: Option<StatusCode>) {
        self.gauge.dec();
    }
}

/// Layer that tracks the number of requests currently being processed.
///
/// The gauge is label-less; partitioning in-flight requests is not supported.
#[derive(Clone)]
pub struct InFlightLayer {
    gauge: IntGauge,
}

impl InFlightLayer {
    pub fn new(gauge: IntGauge) -> Self {
        Self { gauge }
    }
}

impl<S> Layer<S> for InFlightLayer {
    type Service = InFlightService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InFlightService {
            inner,
            gauge: self.gauge.clone(),
        }
    }
}

#[derive(Clone)]
pub struct InFlightService<S> {
    inner: S,
    gauge: IntGauge,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for InFlightService<S>
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
        self.gauge.inc();
        let guard = AlwaysRun::new(InFlightRecorder {
            gauge: self.gauge.clone(),
        });
        always_run(self.inner.call(req), guard)
    }
}
