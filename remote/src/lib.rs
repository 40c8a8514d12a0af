//! Client for the remote RPC service.
//!
//! # Protocol
//!
//! Unary calls follow the Connect JSON convention:
//!
//! | Step | Wire |
//! |------|------|
//! | Request | `POST {base_url}/{service}/{method}` with a JSON body |
//! | Credential | `Authorization: Bearer <token>` when the call is authenticated |
//! | Metadata | Inbound `x-real-ip` / `x-forwarded-for` / `user-agent`, forwarded verbatim |
//! | Success | 2xx with the JSON response message (an empty body reads as `null`) |
//! | Failure | non-2xx with `{"code", "message"}` |
//!
//! # Error Handling
//!
//! Every failure comes back as a [`RemoteError`]: remote rejections as
//! `Status` with the code the service chose, and anything that never produced
//! an HTTP answer (DNS, connect, reset, timeout) as `Transport`. This crate
//! does not retry; retry decisions belong to the calling layer's policy.

mod context;
pub mod wire;

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub use context::CallContext;
pub use portal_types;
use portal_types::{ErrorCode, RemoteError};

const CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

const TCP_KEEPALIVE_SECS: u64 = 60;

const POOL_MAX_IDLE_PER_HOST: usize = 100;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const CONNECT_PROTOCOL_VERSION_HEADER: &str = "connect-protocol-version";

#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("invalid RPC base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("RPC base URL {0:?} is not https; set allow_http to permit it")]
    InsecureBaseUrl(String),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Permit plain-http endpoints (local development, test servers).
    pub allow_http: bool,
}

impl RpcClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            allow_http: false,
        }
    }
}

fn base_client_builder(config: &RpcClientConfig) -> reqwest::ClientBuilder {
    use reqwest::header::HeaderMap;

    let mut default_headers = HeaderMap::new();
    default_headers.insert(CONNECT_PROTOCOL_VERSION_HEADER, HeaderValue::from_static("1"));

    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(config.timeout)
        .redirect(reqwest::redirect::Policy::none())
        .https_only(!config.allow_http)
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers)
}

#[derive(Debug, Clone)]
pub struct RpcClient {
    base_url: String,
    http: reqwest::Client,
}

impl RpcClient {
    pub fn new(config: &RpcClientConfig) -> Result<Self, ClientBuildError> {
        let trimmed = config.base_url.trim().trim_end_matches('/');
        let url = reqwest::Url::parse(trimmed).map_err(|e| ClientBuildError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "https" => {}
            "http" if config.allow_http => {}
            "http" => return Err(ClientBuildError::InsecureBaseUrl(config.base_url.clone())),
            other => {
                return Err(ClientBuildError::InvalidBaseUrl {
                    url: config.base_url.clone(),
                    reason: format!("unsupported scheme {other:?}"),
                });
            }
        }

        Ok(Self {
            base_url: trimmed.to_string(),
            http: base_client_builder(config).build()?,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for `service/Method`.
    #[must_use]
    pub fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method.trim_start_matches('/'))
    }

    /// Invoke a unary method and decode its response message.
    pub async fn unary<Req, Resp>(
        &self,
        method: &str,
        request: &Req,
        cx: &CallContext,
    ) -> Result<Resp, RemoteError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let value = self.unary_value(method, request, cx).await?;
        serde_json::from_value(value).map_err(|e| {
            RemoteError::status(
                ErrorCode::Internal,
                format!("unexpected response shape from {method}: {e}"),
            )
        })
    }

    /// Invoke a unary method and return the raw JSON response message.
    pub async fn unary_value<Req>(
        &self,
        method: &str,
        request: &Req,
        cx: &CallContext,
    ) -> Result<Value, RemoteError>
    where
        Req: Serialize + ?Sized,
    {
        let request_id = Uuid::new_v4().to_string();
        let builder = self
            .http
            .post(self.endpoint(method))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .json(request);
        let builder = cx.apply(builder);

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(method, request_id = %request_id, error = %e, "RPC transport failure");
            RemoteError::transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| RemoteError::transport(e.to_string()))?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes).map_err(|e| {
                RemoteError::status(
                    ErrorCode::Internal,
                    format!("malformed response body from {method}: {e}"),
                )
            });
        }

        let body = wire::read_capped_error_body(response).await;
        let raised = wire::decode_error(status.as_u16(), &body);
        tracing::debug!(
            method,
            request_id = %request_id,
            status = status.as_u16(),
            code = %raised.code(),
            "RPC call rejected"
        );
        Err(raised)
    }
}
