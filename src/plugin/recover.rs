use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use super::{dyn_handler, DynHandler, Plugin};
use crate::error::HandlerError;

/// Turns a handler panic into a plain [`HandlerError`].
///
/// The half-written response is discarded; the pool resets it on release, so the
/// next dispatch starts from a zero value. Requires `panic = "unwind"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecoverPlugin;

impl Plugin for RecoverPlugin {
    fn wrap(&self, next: DynHandler) -> DynHandler {
        dyn_handler(move |ctx, req, res| {
            match catch_unwind(AssertUnwindSafe(|| next(ctx, req, res))) {
                Ok(result) => result,
                Err(panic) => {
                    let panic_message = panic_message(panic.as_ref());
                    let backtrace = std::backtrace::Backtrace::capture();
                    error!(
                        request_id = %ctx.request_id(),
                        message_id = %ctx.message_id(),
                        panic_message = %panic_message,
                        backtrace = %backtrace,
                        "Handler panicked - CRITICAL"
                    );
                    Err(HandlerError::plain(format!("handler panicked: {panic_message}")))
                }
            }
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
