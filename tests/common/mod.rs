//! Shared test utilities and fixtures
//!
//! A wiremock server standing in for the remote RPC service, plus credential
//! helpers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use portal_action::{CallPolicy, RetryPolicy};
use portal_remote::{RpcClient, RpcClientConfig};
use portal_session::{CookieJarStore, CookiePolicy, CredentialStore};
use portal_types::{Credential, SessionToken};

pub const RPC_PREFIX: &str = "/rpc";

pub async fn start_rpc_mock() -> MockServer {
    MockServer::start().await
}

pub fn rpc_client(server: &MockServer) -> RpcClient {
    let mut config = RpcClientConfig::new(format!("{}{RPC_PREFIX}", server.uri()));
    config.allow_http = true;
    config.timeout = Duration::from_secs(5);
    RpcClient::new(&config).unwrap()
}

pub fn rpc_path(method_name: &str) -> String {
    format!("{RPC_PREFIX}/{method_name}")
}

/// Mount a 200 response for `method_name`.
pub async fn mount_ok(server: &MockServer, method_name: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(rpc_path(method_name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount a Connect-style error response for `method_name`.
pub async fn mount_error(
    server: &MockServer,
    method_name: &str,
    status: u16,
    code: &str,
    message: &str,
) {
    Mock::given(method("POST"))
        .and(path(rpc_path(method_name)))
        .respond_with(
            ResponseTemplate::new(status).set_body_json(json!({"code": code, "message": message})),
        )
        .mount(server)
        .await;
}

pub fn credential(token: &str) -> Credential {
    Credential::new(
        SessionToken::new(token).unwrap(),
        Utc::now() + chrono::Duration::hours(1),
    )
}

pub fn signed_in_jar(token: &str) -> Arc<CookieJarStore> {
    let store = Arc::new(CookieJarStore::new(CookiePolicy::development()));
    store.set(&credential(token)).unwrap();
    store
}

/// Call policy with the default retry table but no waiting between attempts.
pub fn instant_policy() -> CallPolicy {
    CallPolicy {
        retry: RetryPolicy {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..RetryPolicy::default()
        },
        ..CallPolicy::default()
    }
}
