use std::time::Instant;

use tracing::{debug, info_span, warn};

use super::{dyn_handler, DynHandler, Plugin};

/// Opens an `invoke` span around each handler call and logs the outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPlugin;

impl Plugin for TracingPlugin {
    fn wrap(&self, next: DynHandler) -> DynHandler {
        dyn_handler(move |ctx, req, res| {
            let span = info_span!(
                "invoke",
                request_id = %ctx.request_id(),
                message_id = %ctx.message_id(),
            );
            let _entered = span.enter();
            let start = Instant::now();
            let result = next(ctx, req, res);
            let latency_us = start.elapsed().as_micros() as u64;
            match &result {
                Ok(()) => debug!(latency_us, "Handler completed"),
                Err(err) => warn!(latency_us, code = err.code(), error = %err, "Handler failed"),
            }
            result
        })
    }
}
