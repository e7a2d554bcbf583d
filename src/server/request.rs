use http::Method;
use may_minihttp::Request;
use std::collections::HashMap;
use std::io::{self, Read};
use thiserror::Error;
use tracing::{debug, warn};

/// Largest body read from a connection
pub const MAX_BODY_BYTES: u64 = 4 * 1024 * 1024;

/// Request body that cannot be handed to the dispatcher.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("request body read failed: {0}")]
    Read(#[from] io::Error),
}

/// Read a whole body, rejecting one longer than `limit` instead of cutting it short.
pub fn read_body<R: Read>(reader: R, limit: u64) -> Result<Vec<u8>, BodyError> {
    let mut body = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut body)?;
    if body.len() as u64 > limit {
        return Err(BodyError::TooLarge { limit });
    }
    Ok(body)
}

/// HTTP request data extracted from `may_minihttp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: Method,
    /// Path without the query string
    pub path: String,
    /// Headers with lowercase names
    pub headers: HashMap<String, String>,
    /// Query string pairs in order
    pub query: Vec<(String, String)>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl ParsedRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// `true` for `application/x-www-form-urlencoded` bodies
    #[must_use]
    pub fn is_form(&self) -> bool {
        self.header("content-type")
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
    }

    /// Decoded form body pairs; empty unless the body is form-encoded.
    #[must_use]
    pub fn form(&self) -> Vec<(String, String)> {
        if self.is_form() {
            parse_pairs(&self.body)
        } else {
            Vec::new()
        }
    }
}

/// Decode `a=1&b=2` into owned pairs.
pub fn parse_pairs(raw: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(raw)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Split a raw target into path and decoded query pairs.
pub fn split_target(target: &str) -> (String, Vec<(String, String)>) {
    match target.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_pairs(query.as_bytes())),
        None => (target.to_string(), Vec::new()),
    }
}

/// Extract everything the binding needs from a `may_minihttp::Request`.
///
/// Fails when the body is over [`MAX_BODY_BYTES`] or cannot be read.
pub fn parse_request(req: Request) -> Result<ParsedRequest, BodyError> {
    let method = Method::from_bytes(req.method().as_bytes()).unwrap_or(Method::GET);
    let (path, query) = split_target(req.path());

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();

    let body = read_body(req.body(), MAX_BODY_BYTES).inspect_err(|err| {
        warn!(method = %method, path = %path, error = %err, "Request body rejected");
    })?;

    debug!(
        method = %method,
        path = %path,
        header_count = headers.len(),
        query_count = query.len(),
        body_bytes = body.len(),
        "HTTP request parsed"
    );

    Ok(ParsedRequest {
        method,
        path,
        headers,
        query,
        body,
    })
}
