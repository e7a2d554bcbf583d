//! Demo echo handler used by the `serve` command and the integration tests.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::Context;
use crate::dispatcher::Dispatcher;
use crate::error::{HandlerError, RegistrationError, ValidationError};
use crate::plugin::{map_request, Plugin};
use crate::typed::handler_fn;
use crate::validator::Validate;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoRequest {
    pub message: String,
}

impl Validate for EchoRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.message.is_empty() {
            return Err(ValidationError::field("message", "required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoResponse {
    pub message: String,
}

pub fn echo_handler(
    _ctx: &Context,
    req: &EchoRequest,
    res: &mut EchoResponse,
) -> Result<(), HandlerError> {
    res.message.push_str(&req.message);
    Ok(())
}

/// Strips surrounding whitespace from the echoed message.
pub fn trim_plugin() -> Arc<dyn Plugin> {
    Arc::new(map_request(|_ctx: &Context, req: &mut EchoRequest| {
        let trimmed = req.message.trim();
        if trimmed.len() != req.message.len() {
            req.message = trimmed.to_string();
        }
        Ok(())
    }))
}

/// Register `echo` and `test::echo`; the latter runs behind [`trim_plugin`].
pub fn register_demo(dispatcher: &Dispatcher) -> Result<(), RegistrationError> {
    dispatcher.register("echo", echo_handler)?;
    dispatcher.register_with("test::echo", handler_fn(echo_handler), &[trim_plugin()])
}
