use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::context::Context;
use crate::error::{DecodeError, DispatchError, HandlerError, RegistrationError};
use crate::message::{MessageId, Payload};
use crate::plugin::Plugin;
use crate::pool::PoolOptions;
use crate::registry::{HandlerDescriptor, Registry, RequestShape, ResponseShape};
use crate::transport::Transport;
use crate::typed::{handler_fn, Handler, Invoke, Request, Response, Typed};
use crate::validator::{NoValidation, StructValidator, Validator};

/// Initial capacity of an encoded response body
const RESPONSE_BUF_CAPACITY: usize = 256;

/// Message registry plus the decode → validate → invoke → encode pipeline.
///
/// Registration takes `&self` and may run while other threads dispatch.
pub struct Dispatcher {
    registry: Registry,
    plugins: Vec<Arc<dyn Plugin>>,
    validator: Arc<dyn Validator>,
    pools: PoolOptions,
    max_payload_bytes: Option<usize>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Dispatcher with struct validation, default pools and no plugins.
    #[must_use]
    pub fn new() -> Self {
        DispatcherBuilder::default().build()
    }

    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Register a function or closure as the handler for `id`.
    ///
    /// ```rust
    /// use brrtdispatch::{Context, Dispatcher, HandlerError, MessageId, Payload};
    /// use serde_json::{json, Value};
    ///
    /// let dispatcher = Dispatcher::new();
    /// dispatcher
    ///     .register("wrap", |_ctx: &Context, req: &Value, res: &mut Value| -> Result<(), HandlerError> {
    ///         *res = json!({ "wrapped": req });
    ///         Ok(())
    ///     })
    ///     .unwrap();
    ///
    /// let id = MessageId::from("wrap");
    /// let body = dispatcher
    ///     .dispatch(&Context::new(&id), &id, Payload::json(b"[1,2]"))
    ///     .unwrap();
    /// assert_eq!(body, br#"{"wrapped":[1,2]}"#);
    /// ```
    pub fn register<Req, Res, F>(
        &self,
        id: impl Into<MessageId>,
        f: F,
    ) -> Result<(), RegistrationError>
    where
        Req: Request,
        Res: Response,
        F: Fn(&Context, &Req, &mut Res) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register_handler(id, handler_fn(f))
    }

    /// Register a [`Handler`] implementation for `id`.
    pub fn register_handler<H: Handler>(
        &self,
        id: impl Into<MessageId>,
        handler: H,
    ) -> Result<(), RegistrationError> {
        self.register_with(id, handler, &[])
    }

    /// Register a [`Handler`] with extra plugins nested inside the dispatcher-wide ones.
    pub fn register_with<H: Handler>(
        &self,
        id: impl Into<MessageId>,
        handler: H,
        plugins: &[Arc<dyn Plugin>],
    ) -> Result<(), RegistrationError> {
        self.install(
            id.into(),
            RequestShape::of::<H::Request>(),
            ResponseShape::of::<H::Response>(),
            Arc::new(Typed(handler)),
            plugins,
        )
    }

    /// Register a type-erased handler against explicit shapes.
    ///
    /// The handler's declared request/response types must equal the shapes.
    pub fn register_dyn(
        &self,
        id: impl Into<MessageId>,
        request: RequestShape,
        response: ResponseShape,
        invoke: Arc<dyn Invoke>,
    ) -> Result<(), RegistrationError> {
        self.install(id.into(), request, response, invoke, &[])
    }

    fn install(
        &self,
        id: MessageId,
        request: RequestShape,
        response: ResponseShape,
        invoke: Arc<dyn Invoke>,
        extra: &[Arc<dyn Plugin>],
    ) -> Result<(), RegistrationError> {
        let plugins: Vec<Arc<dyn Plugin>> = self
            .plugins
            .iter()
            .chain(extra.iter())
            .map(Arc::clone)
            .collect();
        let descriptor = HandlerDescriptor::new(id, request, response, invoke, &plugins, self.pools)
            .map_err(|err| {
                error!(error = %err, "Handler registration rejected");
                err
            })?;
        self.registry.publish(descriptor);
        Ok(())
    }

    /// Remove the handler for `id`. In-flight dispatches finish normally.
    pub fn unregister(&self, id: &MessageId) -> bool {
        self.registry.unregister(id)
    }

    #[must_use]
    pub fn lookup(&self, id: &MessageId) -> Option<Arc<HandlerDescriptor>> {
        self.registry.lookup(id)
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run the pipeline for one message and return the encoded response.
    ///
    /// Request and response instances come from the id's pools and go back on
    /// every exit path.
    pub fn dispatch(
        &self,
        ctx: &Context,
        id: &MessageId,
        payload: Payload<'_>,
    ) -> Result<Vec<u8>, DispatchError> {
        // D1: Handler lookup
        debug!(
            request_id = %ctx.request_id(),
            message_id = %id,
            available_handlers = self.registry.len(),
            "Handler lookup"
        );
        let Some(descriptor) = self.registry.lookup(id) else {
            // D2: Unknown message, nothing acquired
            warn!(
                request_id = %ctx.request_id(),
                message_id = %id,
                "Unknown message"
            );
            return Err(DispatchError::UnknownMessage(id.clone()));
        };

        if let Some(limit) = self.max_payload_bytes {
            let size = payload.len();
            if size > limit {
                warn!(
                    request_id = %ctx.request_id(),
                    message_id = %id,
                    size,
                    limit,
                    "Payload too large"
                );
                return Err(DecodeError::TooLarge { size, limit }.into());
            }
        }

        // D3: Acquire pooled instances; guards release them on every return below
        let mut request = descriptor.acquire_request();
        let mut response = descriptor.acquire_response();

        // D4: Decode
        if let Err(err) = descriptor.decode(&mut **request, payload) {
            debug!(
                request_id = %ctx.request_id(),
                message_id = %id,
                error = %err,
                "Payload decode failed"
            );
            return Err(err.into());
        }

        // D5: Validate
        if let Err(err) = self
            .validator
            .validate(id, descriptor.request_shape(), &**request)
        {
            debug!(
                request_id = %ctx.request_id(),
                message_id = %id,
                error = %err,
                "Request validation failed"
            );
            return Err(err.into());
        }

        // D6: Invoke through the plugin chain
        descriptor.invoke(ctx, &mut **request, &mut **response)?;

        // D7: Encode
        let mut body = Vec::with_capacity(RESPONSE_BUF_CAPACITY);
        if let Err(err) = descriptor.encode(&**response, &mut body) {
            error!(
                request_id = %ctx.request_id(),
                message_id = %id,
                error = %err,
                "Response encode failed"
            );
            return Err(DispatchError::Encode(err));
        }

        debug!(
            request_id = %ctx.request_id(),
            message_id = %id,
            bytes = body.len(),
            elapsed_us = ctx.elapsed().as_micros() as u64,
            "Dispatch complete"
        );
        Ok(body)
    }

    /// Serve one transport request end to end.
    pub fn serve<T: Transport>(&self, transport: &T, req: &mut T::Request) {
        let id = match transport.message_id(req) {
            Ok(id) => id,
            Err(err) => {
                info!(error = %err, "Rejected request without usable message id");
                transport.report_error(req, &err);
                return;
            }
        };
        let ctx = transport.context(req, &id);
        let result = self.dispatch(&ctx, &id, transport.payload(req));
        match result {
            Ok(body) => transport.write_response(req, body),
            Err(err) => transport.report_error(req, &err),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("plugins", &self.plugins.len())
            .field("pools", &self.pools)
            .field("max_payload_bytes", &self.max_payload_bytes)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    plugins: Vec<Arc<dyn Plugin>>,
    validator: Arc<dyn Validator>,
    pools: PoolOptions,
    max_payload_bytes: Option<usize>,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        DispatcherBuilder {
            plugins: Vec::new(),
            validator: Arc::new(StructValidator),
            pools: PoolOptions::default(),
            max_payload_bytes: None,
        }
    }
}

impl DispatcherBuilder {
    /// Add a plugin applied to every handler registered afterwards.
    /// Plugins added first run outermost.
    #[must_use]
    pub fn plugin(mut self, plugin: impl Plugin) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    #[must_use]
    pub fn plugin_arc(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: impl Validator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Skip validation entirely.
    #[must_use]
    pub fn without_validation(self) -> Self {
        self.validator(NoValidation)
    }

    #[must_use]
    pub fn pool_options(mut self, pools: PoolOptions) -> Self {
        self.pools = pools;
        self
    }

    /// Reject JSON payloads larger than `limit` bytes before decoding.
    #[must_use]
    pub fn max_payload_bytes(mut self, limit: usize) -> Self {
        self.max_payload_bytes = Some(limit);
        self
    }

    #[must_use]
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            registry: Registry::new(),
            plugins: self.plugins,
            validator: self.validator,
            pools: self.pools,
            max_payload_bytes: self.max_payload_bytes,
        }
    }
}
