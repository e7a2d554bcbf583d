use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{DecodeError, HandlerError, RegistrationError};
use crate::message::{Message, MessageId, Payload};
use crate::plugin::{compose, dyn_handler, DynHandler, Plugin};
use crate::pool::{Pool, PoolOptions, PoolStats, Pooled};
use crate::typed::Invoke;

use super::shape::{Erased, RequestShape, ResponseShape};

/// A validated handler bound to one message id.
///
/// Owns the request/response pools for its id and the plugin-composed handler.
/// Immutable once built; re-registration publishes a new descriptor and
/// dispatches still holding this one finish with it.
pub struct HandlerDescriptor {
    id: MessageId,
    request: RequestShape,
    response: ResponseShape,
    requests: Pool<Erased>,
    responses: Pool<Erased>,
    handler: DynHandler,
}

impl HandlerDescriptor {
    /// Check `invoke` against the shapes, compose `plugins` around it and build
    /// the pools.
    pub fn new(
        id: MessageId,
        request: RequestShape,
        response: ResponseShape,
        invoke: Arc<dyn Invoke>,
        plugins: &[Arc<dyn Plugin>],
        pools: PoolOptions,
    ) -> Result<Self, RegistrationError> {
        if id.is_empty() {
            return Err(RegistrationError::InvalidIdentifier);
        }
        if invoke.request_type() != request.info() {
            return Err(RegistrationError::RequestShapeMismatch {
                id,
                handler: invoke.request_type().name(),
                shape: request.info().name(),
            });
        }
        if invoke.response_type() != response.info() {
            return Err(RegistrationError::ResponseShapeMismatch {
                id,
                handler: invoke.response_type().name(),
                shape: response.info().name(),
            });
        }

        let terminal = dyn_handler(move |ctx, req, res| invoke.invoke(ctx, req, res));
        let handler = compose(terminal, plugins);

        Ok(HandlerDescriptor {
            id,
            request,
            response,
            requests: erased_pool(request.construct_fn(), request.reset_fn(), pools),
            responses: erased_pool(response.construct_fn(), response.reset_fn(), pools),
            handler,
        })
    }

    #[must_use]
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    #[must_use]
    pub fn request_shape(&self) -> &RequestShape {
        &self.request
    }

    #[must_use]
    pub fn response_shape(&self) -> &ResponseShape {
        &self.response
    }

    /// Zero-valued request from this id's pool.
    pub fn acquire_request(&self) -> Pooled<'_, Erased> {
        self.requests.acquire()
    }

    /// Zero-valued response from this id's pool.
    pub fn acquire_response(&self) -> Pooled<'_, Erased> {
        self.responses.acquire()
    }

    #[must_use]
    pub fn request_pool_stats(&self) -> PoolStats {
        self.requests.stats()
    }

    #[must_use]
    pub fn response_pool_stats(&self) -> PoolStats {
        self.responses.stats()
    }

    pub fn decode(&self, target: &mut dyn Message, payload: Payload<'_>) -> Result<(), DecodeError> {
        self.request.decode(target, payload)
    }

    /// Run the composed plugin chain and handler.
    pub fn invoke(
        &self,
        ctx: &Context,
        req: &mut dyn Message,
        res: &mut dyn Message,
    ) -> Result<(), HandlerError> {
        (self.handler)(ctx, req, res)
    }

    pub fn encode(&self, value: &dyn Message, out: &mut Vec<u8>) -> Result<(), serde_json::Error> {
        self.response.encode(value, out)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("response", &self.response)
            .field("requests", &self.requests)
            .field("responses", &self.responses)
            .finish_non_exhaustive()
    }
}

fn erased_pool(
    construct: fn() -> Erased,
    reset: fn(&mut dyn Message),
    options: PoolOptions,
) -> Pool<Erased> {
    Pool::with_factory(construct, move |slot: &mut Erased| reset(&mut **slot)).with_options(options)
}
