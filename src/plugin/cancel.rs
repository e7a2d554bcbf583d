use tracing::debug;

use super::{dyn_handler, DynHandler, Plugin};
use crate::error::{codes, HandlerError};

/// Refuses to start a handler whose context is already cancelled or past its
/// deadline. Handlers already running are not interrupted.
#[derive(Debug, Default, Clone, Copy)]
pub struct CancelPlugin;

impl Plugin for CancelPlugin {
    fn wrap(&self, next: DynHandler) -> DynHandler {
        dyn_handler(move |ctx, req, res| {
            if ctx.is_cancelled() {
                debug!(
                    request_id = %ctx.request_id(),
                    message_id = %ctx.message_id(),
                    elapsed_ms = ctx.elapsed().as_millis() as u64,
                    "Skipping cancelled dispatch"
                );
                return Err(HandlerError::coded(codes::CANCELLED, "request cancelled"));
            }
            next(ctx, req, res)
        })
    }
}
