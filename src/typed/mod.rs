//! # Typed Module
//!
//! Type-safe handlers and the type-erasure adapter the registry stores.
//!
//! ## Overview
//!
//! Handlers are written against concrete request/response structs:
//!
//! ```rust
//! use brrtdispatch::{Context, HandlerError};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct GetPetRequest { id: u64 }
//! impl brrtdispatch::Validate for GetPetRequest {}
//!
//! #[derive(Debug, Default, Serialize)]
//! struct GetPetResponse { id: u64, name: String }
//!
//! fn get_pet(_ctx: &Context, req: &GetPetRequest, res: &mut GetPetResponse) -> Result<(), HandlerError> {
//!     res.id = req.id;
//!     res.name = "Fluffy".to_string();
//!     Ok(())
//! }
//! ```
//!
//! A plain function or closure with that signature registers through
//! `Dispatcher::register`; a struct implementing [`Handler`] registers through
//! `Dispatcher::register_handler`. Either way the compiler checks the shape.
//!
//! ## Type erasure
//!
//! The registry holds handlers of many shapes in one map, so each handler is
//! wrapped in [`Typed`], which implements [`Invoke`]: one `invoke` over
//! `&mut dyn Message` values plus the [`TypeInfo`] of the request and response it
//! expects. Registration compares that type information against the registered
//! shapes once, at startup. Fully dynamic handlers can implement [`Invoke`]
//! directly or use [`RawHandler`].

mod core;

pub use self::core::*;
