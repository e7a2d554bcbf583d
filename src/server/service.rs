use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tracing::debug;

use super::binding::{HttpBinding, HttpExchange, Route};
use super::request::{parse_request, BodyError, ParsedRequest};
use super::response::{envelope_bytes, write_json, write_text};
use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::plugin::MetricsPlugin;

/// `may_minihttp` service that feeds requests to a [`Dispatcher`].
///
/// Routes:
/// - `GET /health`
/// - `GET /metrics` (when a [`MetricsPlugin`] is attached)
/// - `POST {path}` form style, id and payload in form fields
/// - `GET|POST /{module}/{message}` path style
#[derive(Clone)]
pub struct AppService {
    pub dispatcher: Arc<Dispatcher>,
    pub binding: Arc<HttpBinding>,
    pub metrics: Option<MetricsPlugin>,
}

impl AppService {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, binding: HttpBinding) -> Self {
        Self {
            dispatcher,
            binding: Arc::new(binding),
            metrics: None,
        }
    }

    /// Expose `metrics` at `GET /metrics` and count every HTTP request.
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsPlugin) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Route and answer one parsed request; returns status and JSON body.
    pub fn handle(&self, request: ParsedRequest) -> (u16, Vec<u8>) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_top_level_request();
        }

        let route = if request.method == Method::POST && request.path == self.binding.config().path {
            Some(Route::Form)
        } else if request.method == Method::GET || request.method == Method::POST {
            Route::from_path(&request.path)
        } else {
            None
        };

        let Some(route) = route else {
            debug!(method = %request.method, path = %request.path, "No route");
            return not_found(&request);
        };

        let mut exchange = HttpExchange::new(request, route);
        self.dispatcher.serve(&*self.binding, &mut exchange);
        match exchange.take_reply() {
            Some(body) => (200, body),
            None => (
                500,
                json!({ "error": "No reply written" }).to_string().into_bytes(),
            ),
        }
    }

    /// Answer a request whose body never reached the dispatcher.
    pub fn reject_body(&self, err: &BodyError) -> (u16, Vec<u8>) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_top_level_request();
        }
        let envelope = DispatchError::BadRequest(err.to_string().into()).envelope();
        (200, envelope_bytes(&envelope))
    }
}

fn not_found(request: &ParsedRequest) -> (u16, Vec<u8>) {
    let body = json!({
        "error": "Not Found",
        "method": request.method.as_str(),
        "path": request.path,
    });
    (404, body.to_string().into_bytes())
}

/// Basic health check endpoint returning `{ "status": "ok" }`.
pub fn health_endpoint(res: &mut Response) -> io::Result<()> {
    write_json(res, 200, br#"{"status":"ok"}"#.to_vec());
    Ok(())
}

/// Metrics endpoint returning Prometheus text format statistics.
pub fn metrics_endpoint(res: &mut Response, metrics: &MetricsPlugin) -> io::Result<()> {
    write_text(res, 200, metrics.render_prometheus());
    Ok(())
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let request = match parse_request(req) {
            Ok(request) => request,
            Err(err) => {
                let (status, body) = self.reject_body(&err);
                write_json(res, status, body);
                return Ok(());
            }
        };

        if request.method == Method::GET && request.path == "/health" {
            if let Some(metrics) = &self.metrics {
                metrics.inc_top_level_request();
            }
            return health_endpoint(res);
        }
        if request.method == Method::GET && request.path == "/metrics" {
            if let Some(metrics) = &self.metrics {
                metrics.inc_top_level_request();
                return metrics_endpoint(res, metrics);
            }
            let (status, body) = not_found(&request);
            write_json(res, status, body);
            return Ok(());
        }

        let (status, body) = self.handle(request);
        write_json(res, status, body);
        Ok(())
    }
}
