//! HTTP binding over `may_minihttp`.
//!
//! [`HttpBinding`] implements [`Transport`](crate::transport::Transport) for
//! the two request styles: a form post to the configured path carrying
//! `msg_id` and `msg`, and `/{module}/{message}` with fields in the query string
//! or body. Replies are always status 200 with either the encoded response or
//! an error envelope. [`AppService`] adds `/health` and `/metrics`.

pub mod binding;
pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use binding::{HttpBinding, HttpExchange, Route};
pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_request, read_body, BodyError, ParsedRequest, MAX_BODY_BYTES};
pub use service::{health_endpoint, metrics_endpoint, AppService};
