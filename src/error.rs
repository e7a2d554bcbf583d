//! # Error Module
//!
//! Error taxonomy for registration and dispatch.
//!
//! - [`RegistrationError`] is a startup fault: a handler whose shape does not
//!   match the shapes it was registered with. Startup code decides whether to halt.
//! - [`DispatchError`] covers every per-request failure. The pipeline never panics
//!   on these; they are handed to the transport's `report_error`, which renders an
//!   [`ErrorEnvelope`].
//!
//! Pool allocation failure has no variant here: the global allocator aborts the
//! process, which is the intended behaviour for resource exhaustion.

use crate::message::MessageId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Error codes written into [`ErrorEnvelope::error_code`].
pub mod codes {
    /// Uncoded handler errors
    pub const PLAIN: i32 = -1;
    /// Payload did not parse into the request shape
    pub const DECODE: i32 = -1;
    /// No handler registered for the message id
    pub const UNKNOWN_MESSAGE: i32 = -10;
    /// Transport could not extract a usable message id
    pub const BAD_REQUEST: i32 = -11;
    /// Response value could not be serialized
    pub const ENCODE: i32 = -12;
    /// Decoded request failed validation
    pub const VALIDATION: i32 = -13;
    /// Context was cancelled before the handler ran
    pub const CANCELLED: i32 = -14;
}

/// Registration failed. Treated as a programmer error by startup code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// Named identifiers must not be empty
    #[error("message identifier must not be empty")]
    InvalidIdentifier,
    /// The handler's request type differs from the registered request shape
    #[error("handler for `{id}` takes request `{handler}` but was registered with `{shape}`")]
    RequestShapeMismatch {
        id: MessageId,
        handler: &'static str,
        shape: &'static str,
    },
    /// The handler's response type differs from the registered response shape
    #[error("handler for `{id}` writes response `{handler}` but was registered with `{shape}`")]
    ResponseShapeMismatch {
        id: MessageId,
        handler: &'static str,
        shape: &'static str,
    },
}

/// Payload could not be decoded into the request shape.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("bad json msg: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload of {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    /// The pooled instance was not of the registered shape
    #[error("pooled request is not a `{expected}`")]
    ShapeMismatch { expected: &'static str },
}

/// One failing field reported by a validation hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: Cow<'static, str>,
    pub reason: Cow<'static, str>,
}

/// Decoded request failed validation.
///
/// Carries the failing fields when the hook knows them; most requests fail on a
/// handful of fields so they live inline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    fields: SmallVec<[FieldError; 4]>,
    message: Option<Cow<'static, str>>,
}

impl ValidationError {
    /// Validation failure without field detail
    #[must_use]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        ValidationError {
            fields: SmallVec::new(),
            message: Some(message.into()),
        }
    }

    /// Validation failure on a single field
    #[must_use]
    pub fn field(field: impl Into<Cow<'static, str>>, reason: impl Into<Cow<'static, str>>) -> Self {
        ValidationError::default().and(field, reason)
    }

    /// Add another failing field.
    #[must_use]
    pub fn and(
        mut self,
        field: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.push(field, reason);
        self
    }

    pub fn push(&mut self, field: impl Into<Cow<'static, str>>, reason: impl Into<Cow<'static, str>>) {
        self.fields.push(FieldError {
            field: field.into(),
            reason: reason.into(),
        });
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        &self.fields
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// `true` when nothing was recorded; validators use this to decide `Ok`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.message.is_none()
    }

    /// `Ok(())` when empty, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid json args")?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        for (idx, field) in self.fields.iter().enumerate() {
            let sep = if idx == 0 && self.message.is_none() { ": " } else { ", " };
            write!(f, "{sep}{} ({})", field.field, field.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Business-logic failure returned by a handler or plugin.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// Caller-visible code and message
    #[error("{message} (code {code})")]
    Coded { code: i32, message: String },
    /// Opaque failure, reported with code `-1`
    #[error("{0}")]
    Plain(String),
}

impl HandlerError {
    #[must_use]
    pub fn coded(code: i32, message: impl Into<String>) -> Self {
        HandlerError::Coded {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn plain(message: impl Into<String>) -> Self {
        HandlerError::Plain(message.into())
    }

    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            HandlerError::Coded { code, .. } => *code,
            HandlerError::Plain(_) => codes::PLAIN,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            HandlerError::Coded { message, .. } => message,
            HandlerError::Plain(message) => message,
        }
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        HandlerError::Plain(format!("{err:#}"))
    }
}

/// Any failure of one dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown message: {0}")]
    UnknownMessage(MessageId),
    #[error("bad request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl DispatchError {
    /// Code reported to the caller.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            DispatchError::UnknownMessage(_) => codes::UNKNOWN_MESSAGE,
            DispatchError::BadRequest(_) => codes::BAD_REQUEST,
            DispatchError::Decode(_) => codes::DECODE,
            DispatchError::Validation(_) => codes::VALIDATION,
            DispatchError::Handler(err) => err.code(),
            DispatchError::Encode(_) => codes::ENCODE,
        }
    }

    /// Caller-visible message. Coded handler errors surface their message verbatim.
    #[must_use]
    pub fn caller_message(&self) -> String {
        match self {
            DispatchError::Handler(err) => err.message().to_string(),
            other => other.to_string(),
        }
    }

    /// Structured envelope for the transport to serialize.
    #[must_use]
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error_code: self.code(),
            error_message: self.caller_message(),
        }
    }
}

/// Wire shape of a failed dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub error_code: i32,
    pub error_message: String,
}
