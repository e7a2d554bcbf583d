use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::{dyn_handler, DynHandler, Plugin};
use crate::message::MessageId;

/// Counters for one message id.
#[derive(Debug, Default)]
pub struct MessageMetrics {
    calls: AtomicU64,
    errors: AtomicU64,
    total_latency_ns: AtomicU64,
}

impl MessageMetrics {
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Mean handler latency, zero before the first call
    pub fn average_latency(&self) -> Duration {
        let calls = self.calls();
        if calls == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / calls)
        }
    }

    fn record(&self, latency: Duration, failed: bool) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        if failed {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Default)]
struct MetricsState {
    per_message: DashMap<MessageId, MessageMetrics>,
    top_level_requests: AtomicU64,
}

/// Per-message call counts, error counts and latency.
///
/// Clones share the same counters, so one instance can be installed on the
/// dispatcher and handed to the HTTP binding for `/metrics`.
#[derive(Debug, Default, Clone)]
pub struct MetricsPlugin {
    state: Arc<MetricsState>,
}

impl MetricsPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls across every message id
    pub fn total_calls(&self) -> u64 {
        self.state.per_message.iter().map(|m| m.calls()).sum()
    }

    /// Errors across every message id
    pub fn total_errors(&self) -> u64 {
        self.state.per_message.iter().map(|m| m.errors()).sum()
    }

    /// `(calls, errors)` for one id; `None` before its first call.
    pub fn counts(&self, id: &MessageId) -> Option<(u64, u64)> {
        self.state
            .per_message
            .get(id)
            .map(|m| (m.calls(), m.errors()))
    }

    pub fn average_latency(&self, id: &MessageId) -> Option<Duration> {
        self.state.per_message.get(id).map(|m| m.average_latency())
    }

    /// Count a request served outside the dispatcher, like `/health`.
    pub fn inc_top_level_request(&self) {
        self.state.top_level_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn top_level_request_count(&self) -> u64 {
        self.state.top_level_requests.load(Ordering::Relaxed)
    }

    fn record(&self, id: &MessageId, latency: Duration, failed: bool) {
        if let Some(metrics) = self.state.per_message.get(id) {
            metrics.record(latency, failed);
            return;
        }
        self.state
            .per_message
            .entry(id.clone())
            .or_default()
            .record(latency, failed);
    }

    /// Prometheus text exposition, ids sorted for stable output.
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let mut rows: Vec<(MessageId, u64, u64, f64)> = self
            .state
            .per_message
            .iter()
            .map(|entry| {
                let m = entry.value();
                (
                    entry.key().clone(),
                    m.calls(),
                    m.errors(),
                    m.average_latency().as_secs_f64(),
                )
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        let mut body = String::new();
        body.push_str(
            "# HELP brrtdispatch_top_level_requests_total Requests served outside the dispatcher\n\
             # TYPE brrtdispatch_top_level_requests_total counter\n",
        );
        let _ = writeln!(
            body,
            "brrtdispatch_top_level_requests_total {}",
            self.top_level_request_count()
        );
        body.push_str(
            "# HELP brrtdispatch_invocations_total Handler invocations per message\n\
             # TYPE brrtdispatch_invocations_total counter\n",
        );
        for (id, calls, _, _) in &rows {
            let _ = writeln!(body, "brrtdispatch_invocations_total{{message=\"{id}\"}} {calls}");
        }
        body.push_str(
            "# HELP brrtdispatch_invocation_errors_total Failed handler invocations per message\n\
             # TYPE brrtdispatch_invocation_errors_total counter\n",
        );
        for (id, _, errors, _) in &rows {
            let _ = writeln!(
                body,
                "brrtdispatch_invocation_errors_total{{message=\"{id}\"}} {errors}"
            );
        }
        body.push_str(
            "# HELP brrtdispatch_invocation_latency_seconds Average handler latency per message\n\
             # TYPE brrtdispatch_invocation_latency_seconds gauge\n",
        );
        for (id, _, _, latency) in &rows {
            let _ = writeln!(
                body,
                "brrtdispatch_invocation_latency_seconds{{message=\"{id}\"}} {latency}"
            );
        }
        body
    }
}

impl Plugin for MetricsPlugin {
    fn wrap(&self, next: DynHandler) -> DynHandler {
        let metrics = self.clone();
        dyn_handler(move |ctx, req, res| {
            let start = Instant::now();
            let result = next(ctx, req, res);
            metrics.record(ctx.message_id(), start.elapsed(), result.is_err());
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::error::HandlerError;

    #[test]
    fn test_counts_calls_and_errors_per_message() {
        let metrics = MetricsPlugin::new();
        let handler = metrics.wrap(dyn_handler(|ctx, _, _| {
            if ctx.message_id() == &MessageId::from("bad") {
                Err(HandlerError::plain("nope"))
            } else {
                Ok(())
            }
        }));
        for _ in 0..3 {
            handler(&Context::new("good"), &mut (), &mut ()).unwrap();
        }
        let _ = handler(&Context::new("bad"), &mut (), &mut ());

        assert_eq!(metrics.counts(&"good".into()), Some((3, 0)));
        assert_eq!(metrics.counts(&"bad".into()), Some((1, 1)));
        assert_eq!(metrics.counts(&"never".into()), None);
        assert_eq!(metrics.total_calls(), 4);
        assert_eq!(metrics.total_errors(), 1);

        let text = metrics.render_prometheus();
        assert!(text.contains("brrtdispatch_invocations_total{message=\"good\"} 3"));
        assert!(text.contains("brrtdispatch_invocation_errors_total{message=\"bad\"} 1"));
    }
}
