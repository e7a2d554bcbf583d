//! # brrtdispatch
//!
//! **brrtdispatch** is a message-dispatch registry for the `may` coroutine runtime.
//! Handlers are registered against a [`MessageId`] with a typed request and
//! response; the dispatcher decodes a payload, validates it, runs the handler
//! behind a plugin chain and encodes the response to JSON.
//!
//! ## Architecture
//!
//! - **[`registry`]** - Lock-free id → handler snapshot with shape checks at registration
//! - **[`dispatcher`]** - Decode → validate → invoke → encode pipeline
//! - **[`typed`]** - Typed handler traits and the type-erased invocation seam
//! - **[`plugin`]** - Onion-style handler wrappers (tracing, metrics, recovery, cancellation)
//! - **[`pool`]** - Reusable request/response instances, reset on release
//! - **[`validator`]** - Per-type validation rules and the pipeline hook
//! - **[`transport`]** - Contract for anything that carries requests to the dispatcher
//! - **[`server`]** - `may_minihttp` binding with form-style and path-style requests
//! - **[`config`]**, **[`runtime_config`]**, **[`otel`]** - Configuration and logging
//!
//! ### Dispatch Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant T as Transport
//!     participant D as Dispatcher
//!     participant R as Registry
//!     participant P as Pools
//!     participant C as Plugin chain
//!     participant H as Handler
//!
//!     T->>D: serve(req)
//!     D->>T: message_id(req), payload(req)
//!     D->>R: lookup(id)
//!     alt unknown id
//!         D-->>T: report_error(UnknownMessage)
//!     else registered
//!         D->>P: acquire request + response
//!         D->>D: decode payload, validate
//!         D->>C: invoke(ctx, req, res)
//!         C->>H: handle
//!         H-->>C: Ok / HandlerError
//!         C-->>D: result
//!         D->>D: encode response
//!         D->>P: release (reset) both instances
//!         D-->>T: write_response / report_error
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtdispatch::{Context, Dispatcher, HandlerError, MessageId, Payload};
//! use brrtdispatch::{Validate, ValidationError};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct Add {
//!     a: i64,
//!     b: i64,
//! }
//!
//! impl Validate for Add {}
//!
//! #[derive(Debug, Default, Serialize)]
//! struct Sum {
//!     sum: i64,
//! }
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher
//!     .register(1001u64, |_ctx: &Context, req: &Add, res: &mut Sum| -> Result<(), HandlerError> {
//!         res.sum = req.a + req.b;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let id = MessageId::from(1001u64);
//! let body = dispatcher
//!     .dispatch(&Context::new(&id), &id, Payload::json(br#"{"a":2,"b":3}"#))
//!     .unwrap();
//! assert_eq!(body, br#"{"sum":5}"#);
//! ```
//!
//! ## Error Codes
//!
//! Failures reach callers as `{"errorCode": i32, "errorMessage": string}`:
//!
//! | code | meaning |
//! |------|---------|
//! | `-1` | malformed payload, or a handler error without a code |
//! | `-10` | unknown message id |
//! | `-11` | transport could not extract a message id |
//! | `-12` | response encoding failed |
//! | `-13` | request validation failed |
//! | `-14` | request cancelled |
//! | other | [`HandlerError::Coded`] from the handler |
//!
//! ## Runtime Considerations
//!
//! The HTTP binding runs each request on a `may` coroutine, and the whole
//! pipeline runs on that coroutine's stack. Stack size is configurable via the
//! `BRRTD_STACK_SIZE` environment variable (see [`runtime_config`]). Handlers
//! should use `may`'s blocking facilities rather than parking OS threads.

pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod ids;
pub mod message;
pub mod otel;
pub mod plugin;
pub mod pool;
pub mod registry;
pub mod runtime_config;
pub mod server;
pub mod transport;
pub mod typed;
pub mod validator;

pub use context::{CancelToken, Context};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{
    codes, DecodeError, DispatchError, ErrorEnvelope, HandlerError, RegistrationError,
    ValidationError,
};
pub use ids::RequestId;
pub use message::{Message, MessageId, Payload, TypeInfo};
pub use registry::Registry;
pub use transport::Transport;
pub use typed::{handler_fn, Handler};
pub use validator::{Validate, Validator};
