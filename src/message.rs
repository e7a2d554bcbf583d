//! # Message Module
//!
//! Identifiers, payloads and the type-erased [`Message`] trait that lets the
//! registry hold handlers whose request/response types are only known at
//! registration time.
//!
//! ## Message identifiers
//!
//! A [`MessageId`] is chosen by the transport. Game-style protocols use numeric
//! ids (`10001`), HTTP bindings often use names (`"test::echo"`). Both hash and
//! compare, so either can key the registry.
//!
//! ```rust
//! use brrtdispatch::MessageId;
//!
//! assert_eq!("10001".parse::<MessageId>().unwrap(), MessageId::Num(10001));
//! assert_eq!(MessageId::from("test::echo").to_string(), "test::echo");
//! ```
//!
//! ## Payloads
//!
//! [`Payload`] is the decode source handed to the pipeline. Raw JSON bytes and
//! fields already extracted by the transport (form or query pairs) go through the
//! same pipeline; only the decode step differs.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::convert::Infallible;
use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::Arc;

/// Identifier naming exactly one registered handler.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum MessageId {
    /// Numeric protocol id
    Num(u64),
    /// Named id such as `module::message`
    Name(Arc<str>),
}

impl MessageId {
    /// `true` for a named id with no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, MessageId::Name(name) if name.is_empty())
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        MessageId::Num(id)
    }
}

impl From<&str> for MessageId {
    fn from(name: &str) -> Self {
        MessageId::Name(Arc::from(name))
    }
}

impl From<String> for MessageId {
    fn from(name: String) -> Self {
        MessageId::Name(Arc::from(name))
    }
}

impl From<&MessageId> for MessageId {
    fn from(id: &MessageId) -> Self {
        id.clone()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Num(id) => write!(f, "{id}"),
            MessageId::Name(name) => f.write_str(name),
        }
    }
}

/// All-digit text parses as [`MessageId::Num`], anything else as a name.
impl FromStr for MessageId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = s.parse::<u64>() {
                return Ok(MessageId::Num(id));
            }
        }
        Ok(MessageId::from(s))
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MessageId::Num(id) => serializer.serialize_u64(*id),
            MessageId::Name(name) => serializer.serialize_str(name),
        }
    }
}

/// A request or response value travelling through the pipeline.
///
/// Implemented for every `'static + Send + Sync + Debug` type, so handler
/// authors never implement it by hand. Plugins see requests and responses as
/// `&mut dyn Message` and downcast to the concrete type they care about:
///
/// ```rust
/// use brrtdispatch::Message;
///
/// #[derive(Debug, Default)]
/// struct Ping { seq: u32 }
///
/// let mut boxed: Box<dyn Message> = Box::new(Ping::default());
/// if let Some(ping) = boxed.downcast_mut::<Ping>() {
///     ping.seq = 7;
/// }
/// assert_eq!(boxed.downcast_ref::<Ping>().map(|p| p.seq), Some(7));
/// ```
pub trait Message: Any + Send + Sync + fmt::Debug {
    /// Upcast for downcasting
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + Send + Sync + fmt::Debug> Message for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn Message {
    /// `true` if the erased value is a `T`.
    #[inline]
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Borrow the erased value as a `T`.
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow the erased value as a `T`.
    #[inline]
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Runtime type descriptor used for shape validation at registration.
#[derive(Clone, Copy, Debug)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Describe `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        TypeInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The [`TypeId`] of the described type
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, for diagnostics only
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Decode source for one dispatch.
///
/// Borrowed from the transport's request; it only has to outlive the decode step.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    /// No payload; the handler sees a zero-valued request
    Empty,
    /// Raw JSON document
    Json(&'a [u8]),
    /// Structured fields already extracted by the transport
    Fields(&'a Value),
}

impl<'a> Payload<'a> {
    /// Build a JSON payload, mapping blank input to [`Payload::Empty`].
    #[must_use]
    pub fn json(bytes: &'a [u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            Payload::Empty
        } else {
            Payload::Json(bytes)
        }
    }

    /// Build a field payload, mapping `null` and `{}` to [`Payload::Empty`].
    #[must_use]
    pub fn fields(value: &'a Value) -> Self {
        match value {
            Value::Null => Payload::Empty,
            Value::Object(map) if map.is_empty() => Payload::Empty,
            other => Payload::Fields(other),
        }
    }

    /// `true` when decode should be skipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Empty => true,
            Payload::Json(bytes) => bytes.iter().all(u8::is_ascii_whitespace),
            Payload::Fields(value) => {
                value.is_null() || value.as_object().is_some_and(|map| map.is_empty())
            }
        }
    }

    /// Size in bytes for limit checks. Field payloads are measured as their
    /// JSON encoding.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Payload::Empty => 0,
            Payload::Json(bytes) => bytes.len(),
            Payload::Fields(value) => {
                let mut counter = ByteCounter(0);
                match serde_json::to_writer(&mut counter, value) {
                    Ok(()) => counter.0,
                    Err(_) => usize::MAX,
                }
            }
        }
    }
}

struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 = self.0.saturating_add(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_id_parse() {
        assert_eq!("42".parse::<MessageId>().unwrap(), MessageId::Num(42));
        assert_eq!(
            "test::echo".parse::<MessageId>().unwrap(),
            MessageId::from("test::echo")
        );
        // overflowing digits stay a name rather than failing
        let big = "99999999999999999999999";
        assert_eq!(big.parse::<MessageId>().unwrap(), MessageId::from(big));
    }

    #[test]
    fn test_message_id_serialize() {
        assert_eq!(serde_json::to_value(MessageId::Num(7)).unwrap(), json!(7));
        assert_eq!(
            serde_json::to_value(MessageId::from("a::b")).unwrap(),
            json!("a::b")
        );
    }

    #[test]
    fn test_empty_payloads() {
        assert!(Payload::json(b"  \n").is_empty());
        assert!(matches!(Payload::json(b""), Payload::Empty));
        let empty = json!({});
        assert!(matches!(Payload::fields(&empty), Payload::Empty));
        let fields = json!({"message": "hi"});
        assert!(!Payload::fields(&fields).is_empty());
        assert_eq!(Payload::json(b"{}").len(), 2);
    }

    #[test]
    fn test_field_payload_len_counts_encoded_size() {
        let fields = json!({"message": "hi"});
        assert_eq!(Payload::fields(&fields).len(), r#"{"message":"hi"}"#.len());

        let big = json!({"message": "a".repeat(4096)});
        assert!(Payload::fields(&big).len() > 4096);
        assert_eq!(Payload::Empty.len(), 0);
    }

    #[test]
    fn test_downcast_through_dyn() {
        let mut boxed: Box<dyn Message> = Box::new(5u32);
        assert!(boxed.is::<u32>());
        assert!(!boxed.is::<i64>());
        *boxed.downcast_mut::<u32>().unwrap() += 1;
        assert_eq!(boxed.downcast_ref::<u32>(), Some(&6));
    }

    #[test]
    fn test_type_info_equality() {
        assert_eq!(TypeInfo::of::<String>(), TypeInfo::of::<String>());
        assert_ne!(TypeInfo::of::<String>(), TypeInfo::of::<u8>());
    }
}
