//! Executor against a mocked RPC service

use std::sync::Arc;

use serde_json::{Value, json};
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

use portal_action::{ActionExecutor, ActionOptions, decode};
use portal_remote::RpcClient;
use portal_session::{
    CookieJarStore, CookiePolicy, CredentialStore, HAS_SESSION_COOKIE, SESSION_TOKEN_COOKIE,
    StoreError,
};
use portal_types::{ClientMetadata, ErrorCode, MessageOverrides, PlainEnvelope};

use crate::common::{mount_error, mount_ok, rpc_client, rpc_path, signed_in_jar, start_rpc_mock};

fn browser_metadata() -> ClientMetadata {
    ClientMetadata {
        ip: Some("198.51.100.7".to_string()),
        user_agent: Some("Mozilla/5.0 (X11)".to_string()),
    }
}

async fn call(
    exec: &ActionExecutor,
    client: &RpcClient,
    options: &ActionOptions,
    method_name: &str,
) -> PlainEnvelope {
    exec.execute(options, |cx| async move {
        client.unary_value(method_name, &json!({}), &cx).await
    })
    .await
}

#[tokio::test]
async fn forwards_token_and_metadata_unchanged() {
    let server = start_rpc_mock().await;
    Mock::given(method("POST"))
        .and(path(rpc_path("user.v1.UserService/Me")))
        .and(header("authorization", "Bearer abc"))
        .and(header("x-forwarded-for", "198.51.100.7"))
        .and(header("x-real-ip", "198.51.100.7"))
        .and(header("user-agent", "Mozilla/5.0 (X11)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "email": "a@b.c"})))
        .expect(1)
        .mount(&server)
        .await;

    let exec = ActionExecutor::new(signed_in_jar("abc"), browser_metadata());
    let envelope = call(
        &exec,
        &rpc_client(&server),
        &ActionOptions::authenticated(),
        "user.v1.UserService/Me",
    )
    .await;

    assert_eq!(
        decode::<Value>(envelope).unwrap(),
        json!({"id": 1, "email": "a@b.c"})
    );
}

#[tokio::test]
async fn no_credential_means_no_request() {
    let server = start_rpc_mock().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(CookieJarStore::new(CookiePolicy::development()));
    let exec = ActionExecutor::new(store, ClientMetadata::default());
    let envelope = call(
        &exec,
        &rpc_client(&server),
        &ActionOptions::authenticated(),
        "user.v1.UserService/Me",
    )
    .await;

    assert_eq!(envelope.error().unwrap().code, ErrorCode::Unauthenticated);
}

#[tokio::test]
async fn public_call_omits_authorization() {
    let server = start_rpc_mock().await;
    Mock::given(method("POST"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    mount_ok(&server, "catalog.v1.CatalogService/List", json!({"items": []})).await;

    let exec = ActionExecutor::new(signed_in_jar("abc"), ClientMetadata::default());
    let envelope = call(
        &exec,
        &rpc_client(&server),
        &ActionOptions::public(),
        "catalog.v1.CatalogService/List",
    )
    .await;

    assert!(envelope.is_success());
}

#[tokio::test]
async fn rejected_session_clears_both_markers() {
    let server = start_rpc_mock().await;
    mount_error(
        &server,
        "user.v1.UserService/Me",
        401,
        "unauthenticated",
        "session not found",
    )
    .await;

    let store = signed_in_jar("abc");
    let exec = ActionExecutor::new(store.clone(), ClientMetadata::default());
    let envelope = call(
        &exec,
        &rpc_client(&server),
        &ActionOptions::authenticated(),
        "user.v1.UserService/Me",
    )
    .await;

    let error = envelope.error().unwrap();
    assert_eq!(error.code, ErrorCode::Unauthenticated);
    assert_eq!(error.raw_message, "session not found");
    assert!(!store.has_session());
    assert!(matches!(store.get(), Err(StoreError::Missing)));

    let headers = store.set_cookie_headers();
    for name in [SESSION_TOKEN_COOKIE, HAS_SESSION_COOKIE] {
        assert!(
            headers
                .iter()
                .any(|h| h.starts_with(&format!("{name}=")) && h.contains("Max-Age=0")),
            "{name} not removed: {headers:?}"
        );
    }
}

#[tokio::test]
async fn ordinary_rejection_keeps_session_and_overrides_message() {
    let server = start_rpc_mock().await;
    mount_error(
        &server,
        "user.v1.UserService/Create",
        409,
        "already_exists",
        "duplicate key value",
    )
    .await;

    let store = signed_in_jar("abc");
    let exec = ActionExecutor::new(store.clone(), ClientMetadata::default());
    let overrides =
        MessageOverrides::new().on(ErrorCode::AlreadyExists, "email already registered");
    let options = ActionOptions::authenticated().with_overrides(overrides);
    let envelope = call(
        &exec,
        &rpc_client(&server),
        &options,
        "user.v1.UserService/Create",
    )
    .await;

    let error = envelope.error().unwrap();
    assert_eq!(error.code, ErrorCode::AlreadyExists);
    assert_eq!(error.raw_message, "duplicate key value");
    assert_eq!(error.message, "email already registered");
    assert_eq!(store.get().unwrap().as_str(), "abc");
}

#[tokio::test]
async fn codeless_error_classifies_by_status() {
    let server = start_rpc_mock().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let exec = ActionExecutor::new(signed_in_jar("abc"), ClientMetadata::default());
    let envelope = call(
        &exec,
        &rpc_client(&server),
        &ActionOptions::authenticated(),
        "svc/Method",
    )
    .await;

    let error = envelope.error().unwrap();
    assert_eq!(error.code, ErrorCode::Unavailable);
    assert_eq!(error.raw_message, "upstream unavailable");
}

#[tokio::test]
async fn inbound_cookie_header_authenticates_request() {
    let server = start_rpc_mock().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer from-browser"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(CookieJarStore::from_cookie_header(
        Some("session-token=from-browser; has-session=true"),
        CookiePolicy::default(),
    ));
    assert!(store.has_session());

    let exec = ActionExecutor::new(store, ClientMetadata::default());
    let envelope = call(
        &exec,
        &rpc_client(&server),
        &ActionOptions::authenticated(),
        "svc/Method",
    )
    .await;

    assert!(decode::<bool>(envelope).unwrap());
}
