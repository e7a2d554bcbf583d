use crate::context::Context;
use crate::error::HandlerError;
use crate::message::Message;
use std::sync::Arc;

/// Type-erased handler: the unit plugins wrap and the registry stores.
pub type DynHandler = Arc<
    dyn Fn(&Context, &mut dyn Message, &mut dyn Message) -> Result<(), HandlerError> + Send + Sync,
>;

/// Build a [`DynHandler`] from a closure.
///
/// Going through this function lets the closure's arguments be inferred with the
/// right lifetimes, which `Arc::new(|ctx, req, res| ..)` alone does not.
pub fn dyn_handler<F>(f: F) -> DynHandler
where
    F: Fn(&Context, &mut dyn Message, &mut dyn Message) -> Result<(), HandlerError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Cross-cutting wrapper around a handler.
///
/// `wrap` runs once per registration; the returned handler runs per request and
/// decides whether and when to call `next`.
pub trait Plugin: Send + Sync + 'static {
    fn wrap(&self, next: DynHandler) -> DynHandler;
}

impl<F> Plugin for F
where
    F: Fn(DynHandler) -> DynHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: DynHandler) -> DynHandler {
        self(next)
    }
}

/// Wrap `terminal` in `plugins`, first plugin outermost.
#[must_use]
pub fn compose(terminal: DynHandler, plugins: &[Arc<dyn Plugin>]) -> DynHandler {
    plugins
        .iter()
        .rev()
        .fold(terminal, |next, plugin| plugin.wrap(next))
}

/// Ordered plugin list acting as one plugin.
#[derive(Clone, Default)]
pub struct Chain {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl Chain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin inside the ones already present.
    #[must_use]
    pub fn with(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    #[must_use]
    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }
}

impl Plugin for Chain {
    fn wrap(&self, next: DynHandler) -> DynHandler {
        compose(next, &self.plugins)
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("plugins", &self.plugins.len())
            .finish()
    }
}

/// Combine plugins so `outer` runs first and `others` nest inside it in order.
#[must_use]
pub fn chain(outer: Arc<dyn Plugin>, others: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Chain {
    let mut plugins = vec![outer];
    plugins.extend(others);
    Chain { plugins }
}

/// Pass-through plugin.
#[derive(Debug, Default, Clone, Copy)]
pub struct Nop;

impl Plugin for Nop {
    fn wrap(&self, next: DynHandler) -> DynHandler {
        next
    }
}

#[must_use]
pub fn nop() -> Arc<dyn Plugin> {
    Arc::new(Nop)
}

/// Plugin built from a per-request closure that receives `next` explicitly.
pub struct FromFn<F>(Arc<F>);

/// Build a plugin from `f(ctx, req, res, next)`.
///
/// ```rust
/// use brrtdispatch::plugin::{from_fn, Plugin};
///
/// let audit = from_fn(|ctx, req, res, next| {
///     tracing::debug!(message_id = %ctx.message_id(), "before");
///     let result = next(ctx, req, res);
///     tracing::debug!(ok = result.is_ok(), "after");
///     result
/// });
/// # let _ = audit;
/// ```
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(&Context, &mut dyn Message, &mut dyn Message, &DynHandler) -> Result<(), HandlerError>
        + Send
        + Sync
        + 'static,
{
    FromFn(Arc::new(f))
}

impl<F> Plugin for FromFn<F>
where
    F: Fn(&Context, &mut dyn Message, &mut dyn Message, &DynHandler) -> Result<(), HandlerError>
        + Send
        + Sync
        + 'static,
{
    fn wrap(&self, next: DynHandler) -> DynHandler {
        let f = Arc::clone(&self.0);
        dyn_handler(move |ctx, req, res| f(ctx, req, res, &next))
    }
}

/// Plugin that edits requests of type `T` before the handler sees them.
///
/// Requests of other types pass through untouched, so one instance can sit in a
/// shared chain.
pub fn map_request<T, F>(f: F) -> impl Plugin
where
    T: Message,
    F: Fn(&Context, &mut T) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    from_fn(move |ctx, req, res, next| {
        if let Some(typed) = req.downcast_mut::<T>() {
            f(ctx, typed)?;
        }
        next(ctx, req, res)
    })
}

/// Plugin that edits responses of type `T` after a successful handler call.
pub fn map_response<T, F>(f: F) -> impl Plugin
where
    T: Message,
    F: Fn(&Context, &mut T) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    from_fn(move |ctx, req, res, next| {
        next(ctx, req, res)?;
        match res.downcast_mut::<T>() {
            Some(typed) => f(ctx, typed),
            None => Ok(()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recording(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Arc<dyn Plugin> {
        let log = Arc::clone(log);
        Arc::new(from_fn(move |ctx, req, res, next| {
            log.lock().push(format!("{name}:pre"));
            let out = next(ctx, req, res);
            log.lock().push(format!("{name}:post"));
            out
        }))
    }

    #[test]
    fn test_first_plugin_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner_log = Arc::clone(&log);
        let terminal = dyn_handler(move |_, _, _| {
            inner_log.lock().push("H".to_string());
            Ok(())
        });
        let plugins = chain(recording(&log, "P1"), [recording(&log, "P2")]);
        let handler = plugins.wrap(terminal);

        let mut req = ();
        let mut res = ();
        handler(&Context::new("x"), &mut req, &mut res).unwrap();
        assert_eq!(
            *log.lock(),
            ["P1:pre", "P2:pre", "H", "P2:post", "P1:post"]
        );
    }

    #[test]
    fn test_nop_is_identity() {
        let terminal = dyn_handler(|_, _, _| Err(HandlerError::coded(3, "x")));
        let wrapped = compose(Arc::clone(&terminal), &[nop(), nop()]);
        let err = wrapped(&Context::new(1u64), &mut (), &mut ()).unwrap_err();
        assert_eq!(err.code(), 3);
        assert!(Arc::ptr_eq(&wrapped, &terminal));
    }

    #[test]
    fn test_short_circuit_skips_handler() {
        let called = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&called);
        let terminal = dyn_handler(move |_, _, _| {
            *flag.lock() = true;
            Ok(())
        });
        let deny: Arc<dyn Plugin> = Arc::new(from_fn(|_, _, _, _| Err(HandlerError::coded(401, "denied"))));
        let handler = compose(terminal, &[deny]);
        assert_eq!(handler(&Context::new("x"), &mut (), &mut ()).unwrap_err().code(), 401);
        assert!(!*called.lock());
    }

    #[test]
    fn test_map_request_only_touches_matching_type() {
        let plugin = map_request(|_, value: &mut String| {
            value.push_str(" (edited)");
            Ok(())
        });
        let handler = plugin.wrap(dyn_handler(|_, req, res| {
            let seen = format!("{req:?}");
            if let Some(out) = res.downcast_mut::<String>() {
                *out = seen;
            }
            Ok(())
        }));

        let mut req = String::from("hi");
        let mut res = String::new();
        handler(&Context::new("x"), &mut req, &mut res).unwrap();
        assert_eq!(res, "\"hi (edited)\"");

        let mut other = 5u32;
        handler(&Context::new("x"), &mut other, &mut res).unwrap();
        assert_eq!(other, 5);
    }
}
