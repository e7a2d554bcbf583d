use may_minihttp::Response;

use crate::error::ErrorEnvelope;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

/// Write an already encoded JSON body.
pub fn write_json(res: &mut Response, status: u16, body: Vec<u8>) {
    res.status_code(status as usize, status_reason(status));
    res.header("Content-Type: application/json");
    res.body_vec(body);
}

/// Write a plain-text body.
pub fn write_text(res: &mut Response, status: u16, body: String) {
    res.status_code(status as usize, status_reason(status));
    res.header("Content-Type: text/plain; version=0.0.4");
    res.body_vec(body.into_bytes());
}

/// Serialize an error envelope.
#[must_use]
pub fn envelope_bytes(envelope: &ErrorEnvelope) -> Vec<u8> {
    serde_json::to_vec(envelope).unwrap_or_else(|_| {
        br#"{"errorCode":-1,"errorMessage":"internal error"}"#.to_vec()
    })
}
