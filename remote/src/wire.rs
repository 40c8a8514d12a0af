//! Decoding of remote error responses.
//!
//! The remote service answers failed calls with a JSON body
//! `{"code": "not_found", "message": "..."}`. Bodies without a usable code fall
//! back to the HTTP status mapping on [`ErrorCode::from_http_status`].

use futures_util::StreamExt;
use serde_json::Value;

use portal_types::{ErrorCode, RemoteError};

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

fn extract_message(payload: &Value) -> Option<&str> {
    payload
        .pointer("/message")
        .and_then(Value::as_str)
        .or_else(|| payload.pointer("/error/message").and_then(Value::as_str))
}

fn extract_code(payload: &Value) -> Option<ErrorCode> {
    payload
        .pointer("/code")
        .or_else(|| payload.pointer("/error/code"))
        .and_then(Value::as_str)
        .and_then(ErrorCode::parse)
}

fn status_reason(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map_or_else(|| format!("HTTP {status}"), |reason| reason.to_ascii_lowercase())
}

/// Turn a non-2xx response into the raised failure it represents.
#[must_use]
pub fn decode_error(status: u16, body: &str) -> RemoteError {
    let payload: Option<Value> = serde_json::from_str(body.trim()).ok();

    let code = payload
        .as_ref()
        .and_then(extract_code)
        .unwrap_or_else(|| ErrorCode::from_http_status(status));

    let message = payload
        .as_ref()
        .and_then(extract_message)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(ToString::to_string)
        .or_else(|| {
            let text = body.trim();
            (payload.is_none() && !text.is_empty()).then(|| text.to_string())
        })
        .unwrap_or_else(|| status_reason(status));

    RemoteError::status(code, message)
}
