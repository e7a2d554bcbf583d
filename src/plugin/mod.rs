//! # Plugin Module
//!
//! Cross-cutting wrappers composed around every handler.
//!
//! A [`Plugin`] takes the next handler and returns a new one. Chains compose
//! like an onion: the first plugin supplied is outermost, so with
//! `chain(p1, [p2])` around `h` the pre-logic runs `p1, p2, h` and the
//! post-logic runs `h, p2, p1`. Composition happens once, at registration; the
//! composed handler holds no per-request state.
//!
//! Plugins see requests and responses as `&mut dyn Message` and downcast to the
//! types they care about. [`map_request`] and [`map_response`] wrap the common
//! case of editing one concrete type.
//!
//! ## Built-in plugins
//!
//! - [`TracingPlugin`] - span per invocation with latency and outcome
//! - [`MetricsPlugin`] - per-message call/error counters, Prometheus text output
//! - [`RecoverPlugin`] - handler panics become plain handler errors
//! - [`CancelPlugin`] - skip handlers whose context is already cancelled

mod cancel;
mod core;
mod metrics;
mod recover;
mod tracing;

pub use self::cancel::CancelPlugin;
pub use self::core::{
    chain, compose, dyn_handler, from_fn, map_request, map_response, nop, Chain, DynHandler,
    FromFn, Nop, Plugin,
};
pub use self::metrics::{MessageMetrics, MetricsPlugin};
pub use self::recover::RecoverPlugin;
pub use self::tracing::TracingPlugin;
