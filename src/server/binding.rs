use serde_json::{Map, Value};
use std::borrow::Cow;
use std::str::FromStr;
use tracing::{debug, warn};

use super::request::ParsedRequest;
use super::response::envelope_bytes;
use crate::config::HttpConfig;
use crate::context::Context;
use crate::error::DispatchError;
use crate::ids::RequestId;
use crate::message::{MessageId, Payload};
use crate::transport::Transport;

/// How the message id is carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `POST {path}` with id and JSON payload in form fields
    Form,
    /// `/{module}/{message}`, id `module::message`
    Path { module: String, message: String },
}

impl Route {
    /// Match `/{module}/{message}` with two non-empty segments.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Route> {
        let mut segments = path.trim_matches('/').split('/');
        let module = segments.next().filter(|s| !s.is_empty())?;
        let message = segments.next().filter(|s| !s.is_empty())?;
        if segments.next().is_some() {
            return None;
        }
        Some(Route::Path {
            module: module.to_string(),
            message: message.to_string(),
        })
    }
}

/// One HTTP request travelling through [`Dispatcher::serve`](crate::Dispatcher::serve).
#[derive(Debug)]
pub struct HttpExchange {
    request: ParsedRequest,
    route: Route,
    form: Vec<(String, String)>,
    fields: Value,
    reply: Option<Vec<u8>>,
}

impl HttpExchange {
    #[must_use]
    pub fn new(request: ParsedRequest, route: Route) -> Self {
        let form = request.form();
        let fields = match route {
            Route::Form => Value::Null,
            Route::Path { .. } => {
                let mut map = Map::new();
                for (k, v) in request.query.iter().chain(form.iter()) {
                    map.insert(k.clone(), Value::String(v.clone()));
                }
                Value::Object(map)
            }
        };
        HttpExchange {
            request,
            route,
            form,
            fields,
            reply: None,
        }
    }

    #[must_use]
    pub fn request(&self) -> &ParsedRequest {
        &self.request
    }

    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Form field, falling back to the query string.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .chain(self.request.query.iter())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Body written by the dispatcher, if any.
    pub fn take_reply(&mut self) -> Option<Vec<u8>> {
        self.reply.take()
    }
}

/// [`Transport`] over HTTP requests.
///
/// Both routes reply with status 200; failures carry an error envelope.
#[derive(Debug, Clone)]
pub struct HttpBinding {
    config: HttpConfig,
}

impl HttpBinding {
    #[must_use]
    pub fn new(config: HttpConfig) -> Self {
        HttpBinding { config }
    }

    #[must_use]
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn bad_request(message: String) -> DispatchError {
        DispatchError::BadRequest(Cow::Owned(message))
    }
}

impl Transport for HttpBinding {
    type Request = HttpExchange;

    fn message_id(&self, ex: &HttpExchange) -> Result<MessageId, DispatchError> {
        match &ex.route {
            Route::Form => {
                let field = &self.config.id_field;
                let raw = ex
                    .field(field)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| Self::bad_request(format!("missing {field}")))?;
                if raw.chars().count() > self.config.max_id_len {
                    return Err(Self::bad_request(format!(
                        "{field} longer than {} characters",
                        self.config.max_id_len
                    )));
                }
                Ok(MessageId::from_str(raw).unwrap_or_else(|never| match never {}))
            }
            Route::Path { module, message } => Ok(MessageId::from(format!("{module}::{message}"))),
        }
    }

    fn payload<'a>(&self, ex: &'a HttpExchange) -> Payload<'a> {
        match ex.route {
            Route::Form => ex
                .field(&self.config.payload_field)
                .map_or(Payload::Empty, |msg| Payload::json(msg.as_bytes())),
            Route::Path { .. } => {
                if !ex.request.body.is_empty() && !ex.request.is_form() {
                    Payload::json(&ex.request.body)
                } else {
                    Payload::fields(&ex.fields)
                }
            }
        }
    }

    fn context(&self, ex: &HttpExchange, id: &MessageId) -> Context {
        Context::new(id).with_request_id(RequestId::from_header_or_new(
            ex.request.header("x-request-id"),
        ))
    }

    fn write_response(&self, ex: &mut HttpExchange, body: Vec<u8>) {
        ex.reply = Some(body);
    }

    fn report_error(&self, ex: &mut HttpExchange, err: &DispatchError) {
        let envelope = err.envelope();
        match err {
            DispatchError::Handler(_) => debug!(
                path = %ex.request.path,
                code = envelope.error_code,
                "Handler returned error"
            ),
            _ => warn!(
                path = %ex.request.path,
                code = envelope.error_code,
                error = %err,
                "Dispatch failed"
            ),
        }
        ex.reply = Some(envelope_bytes(&envelope));
    }
}
