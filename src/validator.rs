//! # Validator Module
//!
//! The validate-or-fail hook run between decode and invoke.
//!
//! Field rules belong to the request types themselves: a request implements
//! [`Validate`] (the default accepts everything). The dispatcher runs a
//! [`Validator`] hook per request; the default [`StructValidator`] simply calls the
//! request's own [`Validate`] impl, while applications can install a hook with
//! cross-message rules.
//!
//! ```rust
//! use brrtdispatch::{Validate, ValidationError};
//!
//! #[derive(Debug, Default)]
//! struct Login { user: String, pin: u32 }
//!
//! impl Validate for Login {
//!     fn validate(&self) -> Result<(), ValidationError> {
//!         let mut err = ValidationError::default();
//!         if self.user.is_empty() {
//!             err.push("user", "required");
//!         }
//!         if self.pin > 9999 {
//!             err.push("pin", "max");
//!         }
//!         err.into_result()
//!     }
//! }
//!
//! assert!(Login { user: String::new(), pin: 10_000 }.validate().is_err());
//! ```

use crate::error::ValidationError;
use crate::message::{Message, MessageId};
use crate::registry::RequestShape;
use serde_json::Value;

/// Field-level rules for one request type.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl Validate for () {}

impl Validate for Value {}

/// Hook run against every decoded request.
pub trait Validator: Send + Sync + 'static {
    fn validate(
        &self,
        id: &MessageId,
        shape: &RequestShape,
        request: &dyn Message,
    ) -> Result<(), ValidationError>;
}

/// Runs the request type's own [`Validate`] impl.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructValidator;

impl Validator for StructValidator {
    fn validate(
        &self,
        _id: &MessageId,
        shape: &RequestShape,
        request: &dyn Message,
    ) -> Result<(), ValidationError> {
        shape.validate(request)
    }
}

/// Accepts every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoValidation;

impl Validator for NoValidation {
    fn validate(&self, _: &MessageId, _: &RequestShape, _: &dyn Message) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Closure hooks see the id and the erased request; struct rules still run first.
impl<F> Validator for F
where
    F: Fn(&MessageId, &dyn Message) -> Result<(), ValidationError> + Send + Sync + 'static,
{
    fn validate(
        &self,
        id: &MessageId,
        shape: &RequestShape,
        request: &dyn Message,
    ) -> Result<(), ValidationError> {
        shape.validate(request)?;
        self(id, request)
    }
}
