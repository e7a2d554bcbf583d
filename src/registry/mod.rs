//! # Registry Module
//!
//! Handler descriptors and the copy-on-write table that maps message ids to them.
//!
//! ## Shapes
//!
//! A [`RequestShape`] or [`ResponseShape`] is the runtime face of a concrete
//! request/response type: it builds zero values, resets them, and decodes or
//! encodes them through `serde_json`. Registration checks that the handler's
//! declared types equal the shapes before anything is published, so a handler
//! can never be called with a value of the wrong type.
//!
//! ## Snapshots
//!
//! The [`Registry`] publishes an immutable [`Snapshot`] through `arc_swap`.
//! Lookups are a single atomic load. Registration copies the map, inserts, and
//! swaps; a dispatch that already holds a descriptor keeps using it even if the
//! id is re-registered meanwhile.

mod core;
mod descriptor;
mod shape;

pub use self::core::{Registry, Snapshot};
pub use self::descriptor::HandlerDescriptor;
pub use self::shape::{Erased, RequestShape, ResponseShape};
