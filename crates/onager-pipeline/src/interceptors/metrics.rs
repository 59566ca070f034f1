//! Per-call observability.
//!
//! The metrics interceptor wraps its whole downstream and records one
//! latency + outcome observation per call through the [`MetricsSink`]
//! handed to the builder. No process-wide default registry is consulted:
//! the sink is an explicit handle.

use crate::interceptor::{Interceptor, InterceptorKind, Next};
use metrics::{counter, histogram};
use onager_core::{BoxFuture, CallContext, CallEnvelope, CallResult, MetricsSink};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Records latency and outcome per call, keyed by method.
pub struct MetricsInterceptor {
    sink: Arc<dyn MetricsSink>,
}

impl MetricsInterceptor {
    /// Creates a metrics interceptor recording through `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }
}

impl Interceptor for MetricsInterceptor {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn kind(&self) -> InterceptorKind {
        InterceptorKind::Metrics
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut CallContext,
        envelope: CallEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, CallResult> {
        Box::pin(async move {
            let method = envelope.method().to_string();
            let start = Instant::now();

            let result = next.run(ctx, envelope).await;

            let outcome = match &result {
                Ok(_) => "ok",
                Err(err) => err.code(),
            };
            self.sink.record_call(&method, outcome, start.elapsed());
            result
        })
    }
}

/// A [`MetricsSink`] forwarding to the `metrics` facade.
///
/// Whatever recorder the process installed (a Prometheus exporter, a
/// test recorder) receives:
///
/// - `onager_calls_total{method, outcome}` counter
/// - `onager_call_duration_seconds{method}` histogram
#[derive(Debug, Default, Clone, Copy)]
pub struct RecorderSink;

impl RecorderSink {
    /// Creates a recorder-backed sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MetricsSink for RecorderSink {
    fn record_call(&self, method: &str, outcome: &str, duration: Duration) {
        counter!(
            "onager_calls_total",
            "method" => method.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);

        histogram!(
            "onager_call_duration_seconds",
            "method" => method.to_string()
        )
        .record(duration.as_secs_f64());
    }
}
