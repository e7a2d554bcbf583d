use std::fmt;

use crate::error::{DecodeError, ValidationError};
use crate::message::{Message, Payload, TypeInfo};
use crate::typed::{Request, Response};

/// Erased pooled instance.
pub type Erased = Box<dyn Message>;

/// Runtime descriptor of a request type: build, reset, decode, validate.
#[derive(Clone, Copy)]
pub struct RequestShape {
    info: TypeInfo,
    construct: fn() -> Erased,
    reset: fn(&mut dyn Message),
    decode: fn(&mut dyn Message, Payload<'_>) -> Result<(), DecodeError>,
    validate: fn(&dyn Message) -> Result<(), ValidationError>,
}

impl RequestShape {
    /// Shape of request type `T`.
    #[must_use]
    pub fn of<T: Request>() -> Self {
        RequestShape {
            info: TypeInfo::of::<T>(),
            construct: construct::<T>,
            reset: reset::<T>,
            decode: decode_into::<T>,
            validate: validate_as::<T>,
        }
    }

    #[must_use]
    pub fn info(&self) -> TypeInfo {
        self.info
    }

    /// Fresh zero-valued instance.
    #[must_use]
    pub fn construct(&self) -> Erased {
        (self.construct)()
    }

    /// Reset `value` to the zero value in place.
    pub fn reset(&self, value: &mut dyn Message) {
        (self.reset)(value);
    }

    /// Decode `payload` into `target`, replacing its contents.
    ///
    /// An empty payload leaves `target` untouched.
    pub fn decode(&self, target: &mut dyn Message, payload: Payload<'_>) -> Result<(), DecodeError> {
        if payload.is_empty() {
            return Ok(());
        }
        (self.decode)(target, payload)
    }

    /// Run the request type's own field rules.
    pub fn validate(&self, request: &dyn Message) -> Result<(), ValidationError> {
        (self.validate)(request)
    }

    pub(crate) fn construct_fn(&self) -> fn() -> Erased {
        self.construct
    }

    pub(crate) fn reset_fn(&self) -> fn(&mut dyn Message) {
        self.reset
    }
}

impl fmt::Debug for RequestShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RequestShape").field(&self.info.name()).finish()
    }
}

/// Runtime descriptor of a response type: build, reset, encode.
#[derive(Clone, Copy)]
pub struct ResponseShape {
    info: TypeInfo,
    construct: fn() -> Erased,
    reset: fn(&mut dyn Message),
    encode: fn(&dyn Message, &mut Vec<u8>) -> Result<(), serde_json::Error>,
}

impl ResponseShape {
    /// Shape of response type `T`.
    #[must_use]
    pub fn of<T: Response>() -> Self {
        ResponseShape {
            info: TypeInfo::of::<T>(),
            construct: construct::<T>,
            reset: reset::<T>,
            encode: encode_from::<T>,
        }
    }

    #[must_use]
    pub fn info(&self) -> TypeInfo {
        self.info
    }

    #[must_use]
    pub fn construct(&self) -> Erased {
        (self.construct)()
    }

    pub fn reset(&self, value: &mut dyn Message) {
        (self.reset)(value);
    }

    /// Append the JSON encoding of `value` to `out`.
    pub fn encode(&self, value: &dyn Message, out: &mut Vec<u8>) -> Result<(), serde_json::Error> {
        (self.encode)(value, out)
    }

    pub(crate) fn construct_fn(&self) -> fn() -> Erased {
        self.construct
    }

    pub(crate) fn reset_fn(&self) -> fn(&mut dyn Message) {
        self.reset
    }
}

impl fmt::Debug for ResponseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResponseShape").field(&self.info.name()).finish()
    }
}

fn construct<T: Default + Message>() -> Erased {
    Box::new(T::default())
}

fn reset<T: Default + Message>(value: &mut dyn Message) {
    if let Some(value) = value.downcast_mut::<T>() {
        *value = T::default();
    }
}

fn decode_into<T: Request>(target: &mut dyn Message, payload: Payload<'_>) -> Result<(), DecodeError> {
    let Some(target) = target.downcast_mut::<T>() else {
        return Err(DecodeError::ShapeMismatch {
            expected: std::any::type_name::<T>(),
        });
    };
    *target = match payload {
        Payload::Empty => return Ok(()),
        Payload::Json(bytes) => serde_json::from_slice(bytes)?,
        Payload::Fields(value) => T::deserialize(value)?,
    };
    Ok(())
}

fn validate_as<T: Request>(request: &dyn Message) -> Result<(), ValidationError> {
    match request.downcast_ref::<T>() {
        Some(request) => request.validate(),
        None => Err(ValidationError::new(format!(
            "request is not a `{}`",
            std::any::type_name::<T>()
        ))),
    }
}

fn encode_from<T: Response>(value: &dyn Message, out: &mut Vec<u8>) -> Result<(), serde_json::Error> {
    match value.downcast_ref::<T>() {
        Some(value) => serde_json::to_writer(out, value),
        None => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
            "response is not a `{}`",
            std::any::type_name::<T>()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, serde::Deserialize, Serialize)]
    struct Echo {
        message: String,
    }

    impl crate::validator::Validate for Echo {
        fn validate(&self) -> Result<(), ValidationError> {
            if self.message.is_empty() {
                return Err(ValidationError::field("message", "required"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_decode_json_and_fields() {
        let shape = RequestShape::of::<Echo>();
        let mut value = shape.construct();
        shape
            .decode(&mut *value, Payload::json(br#"{"message":"hi"}"#))
            .unwrap();
        assert_eq!(value.downcast_ref::<Echo>().unwrap().message, "hi");

        let fields = json!({"message": "from form"});
        shape.decode(&mut *value, Payload::fields(&fields)).unwrap();
        assert_eq!(value.downcast_ref::<Echo>().unwrap().message, "from form");

        shape.reset(&mut *value);
        assert_eq!(value.downcast_ref::<Echo>(), Some(&Echo::default()));
    }

    #[test]
    fn test_truncated_json_is_decode_error() {
        let shape = RequestShape::of::<Echo>();
        let mut value = shape.construct();
        let err = shape
            .decode(&mut *value, Payload::json(br#"{"message":"#))
            .unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_wrong_instance_is_rejected() {
        let shape = RequestShape::of::<Echo>();
        let mut other: Erased = Box::new(5u32);
        let err = shape
            .decode(&mut *other, Payload::json(b"{}"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::ShapeMismatch { .. }));
        assert!(shape.validate(&*other).is_err());
    }

    #[test]
    fn test_encode_response() {
        let shape = ResponseShape::of::<Echo>();
        let value: Erased = Box::new(Echo {
            message: "hi".into(),
        });
        let mut out = Vec::new();
        shape.encode(&*value, &mut out).unwrap();
        assert_eq!(out, br#"{"message":"hi"}"#);
    }
}
