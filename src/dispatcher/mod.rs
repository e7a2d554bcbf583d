//! # Dispatcher Module
//!
//! Handler registration and the per-request dispatch pipeline.
//!
//! ## Overview
//!
//! A [`Dispatcher`] owns the [`Registry`](crate::registry::Registry), the
//! dispatcher-wide plugins, the validation hook and the pool sizing applied to
//! each registration. It is the only type a transport needs to talk to.
//!
//! ## Handler Registration
//!
//! ```rust
//! use brrtdispatch::{Context, Dispatcher, HandlerError};
//! use brrtdispatch::plugin::RecoverPlugin;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Deserialize, Serialize)]
//! struct Echo { message: String }
//! impl brrtdispatch::Validate for Echo {}
//!
//! let dispatcher = Dispatcher::builder().plugin(RecoverPlugin).build();
//! dispatcher
//!     .register("echo", |_: &Context, req: &Echo, res: &mut Echo| -> Result<(), HandlerError> {
//!         res.message.clone_from(&req.message);
//!         Ok(())
//!     })
//!     .unwrap();
//! assert!(dispatcher.registry().contains(&"echo".into()));
//! ```
//!
//! ## Request Flow
//!
//! 1. Look up the descriptor for the message id; unknown ids fail before any pool
//!    is touched
//! 2. Acquire a request and a response from the id's pools
//! 3. Decode the payload into the request (empty payloads skip this)
//! 4. Run the validation hook
//! 5. Invoke the plugin chain and handler
//! 6. Encode the response as JSON
//! 7. Release both instances, whatever happened above
//!
//! Every step's failure becomes a [`DispatchError`](crate::DispatchError); the
//! pipeline does not panic on bad input and one request's failure never affects
//! another.
//!
//! ## Concurrency
//!
//! Dispatch takes `&self` and runs on the caller's thread or coroutine; nothing
//! is serialised between requests beyond the short pool free-list lock.
//! Registration also takes `&self` and publishes a new registry snapshot
//! atomically.

mod core;

pub use self::core::{Dispatcher, DispatcherBuilder};
