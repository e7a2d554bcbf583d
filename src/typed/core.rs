use crate::context::Context;
use crate::error::HandlerError;
use crate::message::{Message, TypeInfo};
use crate::plugin::DynHandler;
use crate::validator::Validate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Bounds a request type must meet: decodable, validatable, zero-valued by `Default`.
pub trait Request: DeserializeOwned + Validate + Default + Message {}

impl<T> Request for T where T: DeserializeOwned + Validate + Default + Message {}

/// Bounds a response type must meet: serializable, zero-valued by `Default`.
pub trait Response: Serialize + Default + Message {}

impl<T> Response for T where T: Serialize + Default + Message {}

/// Trait implemented by typed handlers.
///
/// The handler reads the decoded request and fills in the pooled response.
/// Returning an error discards the response; the dispatcher reports the error.
pub trait Handler: Send + Sync + 'static {
    /// The typed request, decoded from the payload
    type Request: Request;
    /// The typed response, serialized on success
    type Response: Response;

    fn handle(
        &self,
        ctx: &Context,
        req: &Self::Request,
        res: &mut Self::Response,
    ) -> Result<(), HandlerError>;
}

/// [`Handler`] built from a function or closure.
pub struct FnHandler<Req, Res, F> {
    f: F,
    _shape: PhantomData<fn(&Req, &mut Res)>,
}

/// Wrap `f` as a [`Handler`].
pub fn handler_fn<Req, Res, F>(f: F) -> FnHandler<Req, Res, F>
where
    Req: Request,
    Res: Response,
    F: Fn(&Context, &Req, &mut Res) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    FnHandler {
        f,
        _shape: PhantomData,
    }
}

impl<Req, Res, F> Handler for FnHandler<Req, Res, F>
where
    Req: Request,
    Res: Response,
    F: Fn(&Context, &Req, &mut Res) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    type Request = Req;
    type Response = Res;

    fn handle(&self, ctx: &Context, req: &Req, res: &mut Res) -> Result<(), HandlerError> {
        (self.f)(ctx, req, res)
    }
}

/// Type-erased call adapter stored in a handler descriptor.
pub trait Invoke: Send + Sync + 'static {
    /// Request type this adapter downcasts to
    fn request_type(&self) -> TypeInfo;
    /// Response type this adapter downcasts to
    fn response_type(&self) -> TypeInfo;

    fn invoke(
        &self,
        ctx: &Context,
        req: &mut dyn Message,
        res: &mut dyn Message,
    ) -> Result<(), HandlerError>;
}

/// Erases a typed [`Handler`].
pub struct Typed<H>(pub H);

impl<H: Handler> Invoke for Typed<H> {
    fn request_type(&self) -> TypeInfo {
        TypeInfo::of::<H::Request>()
    }

    fn response_type(&self) -> TypeInfo {
        TypeInfo::of::<H::Response>()
    }

    fn invoke(
        &self,
        ctx: &Context,
        req: &mut dyn Message,
        res: &mut dyn Message,
    ) -> Result<(), HandlerError> {
        // Registration already matched these types; a miss here means a plugin
        // swapped the values.
        let Some(req) = req.downcast_ref::<H::Request>() else {
            return Err(HandlerError::plain(format!(
                "request is not a `{}`",
                std::any::type_name::<H::Request>()
            )));
        };
        let Some(res) = res.downcast_mut::<H::Response>() else {
            return Err(HandlerError::plain(format!(
                "response is not a `{}`",
                std::any::type_name::<H::Response>()
            )));
        };
        self.0.handle(ctx, req, res)
    }
}

impl<H> fmt::Debug for Typed<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Typed")
            .field(&std::any::type_name::<H>())
            .finish()
    }
}

/// Dynamic handler declaring its own request/response types.
///
/// The declared types are what registration checks; the function itself works on
/// erased values.
pub struct RawHandler {
    request: TypeInfo,
    response: TypeInfo,
    f: DynHandler,
}

impl RawHandler {
    #[must_use]
    pub fn new(request: TypeInfo, response: TypeInfo, f: DynHandler) -> Self {
        RawHandler {
            request,
            response,
            f,
        }
    }
}

impl Invoke for RawHandler {
    fn request_type(&self) -> TypeInfo {
        self.request
    }

    fn response_type(&self) -> TypeInfo {
        self.response
    }

    fn invoke(
        &self,
        ctx: &Context,
        req: &mut dyn Message,
        res: &mut dyn Message,
    ) -> Result<(), HandlerError> {
        (self.f)(ctx, req, res)
    }
}
