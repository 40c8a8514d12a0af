//! Call sites, retries and refresh against a mocked RPC service

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use portal_action::{
    ActionExecutor, ActionOptions, AppContext, CallOutcome, CallSite, CallState, Disposition,
    NotificationQueue, RefreshDriver, RetryPolicy,
};
use portal_remote::RpcClient;
use portal_types::{ClientMetadata, ErrorCode, PlainEnvelope};

use crate::common::{
    instant_policy, mount_error, mount_ok, rpc_client, rpc_path, signed_in_jar, start_rpc_mock,
};

#[derive(Debug, Deserialize, PartialEq)]
struct Order {
    id: u64,
    total_cents: u64,
}

async fn attempt(exec: &ActionExecutor, client: &RpcClient, method_name: &str) -> PlainEnvelope {
    exec.execute(&ActionOptions::authenticated(), |cx| async move {
        client.unary_value(method_name, &json!({"id": 9}), &cx).await
    })
    .await
}

#[tokio::test]
async fn decodes_typed_result() {
    let server = start_rpc_mock().await;
    mount_ok(
        &server,
        "order.v1.OrderService/Get",
        json!({"id": 9, "total_cents": 1250}),
    )
    .await;
    let client = rpc_client(&server);
    let exec = ActionExecutor::new(signed_in_jar("abc"), ClientMetadata::default());
    let ctx = AppContext::default();
    let policy = instant_policy();

    let mut site = CallSite::new(&ctx, &policy);
    let outcome: CallOutcome<Order> = site
        .run(|| attempt(&exec, &client, "order.v1.OrderService/Get"))
        .await;

    assert_eq!(
        outcome,
        CallOutcome::Succeeded(Order {
            id: 9,
            total_cents: 1250
        })
    );
    assert_eq!(site.state(), CallState::Succeeded);
}

#[tokio::test]
async fn unavailable_is_attempted_five_times() {
    let server = start_rpc_mock().await;
    Mock::given(method("POST"))
        .and(path(rpc_path("order.v1.OrderService/Get")))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_json(json!({"code": "unavailable", "message": "overloaded"})),
        )
        .expect(5)
        .mount(&server)
        .await;
    let client = rpc_client(&server);
    let exec = ActionExecutor::new(signed_in_jar("abc"), ClientMetadata::default());
    let queue = Arc::new(NotificationQueue::new());
    let ctx = AppContext::new(queue.clone());
    let policy = instant_policy();

    let mut site = CallSite::new(&ctx, &policy);
    let outcome: CallOutcome<Order> = site
        .run(|| attempt(&exec, &client, "order.v1.OrderService/Get"))
        .await;

    match outcome {
        CallOutcome::Failed { error, disposition } => {
            assert_eq!(error.code, ErrorCode::Unavailable);
            assert!(matches!(disposition, Disposition::Notified(_)));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    let notes = queue.drain();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].text, "Overloaded.");
}

#[tokio::test]
async fn not_found_is_attempted_once() {
    let server = start_rpc_mock().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"code": "not_found", "message": "order not found"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let client = rpc_client(&server);
    let exec = ActionExecutor::new(signed_in_jar("abc"), ClientMetadata::default());
    let ctx = AppContext::default();
    let policy = instant_policy();

    let mut site = CallSite::new(&ctx, &policy);
    let outcome: CallOutcome<Order> = site
        .run(|| attempt(&exec, &client, "order.v1.OrderService/Get"))
        .await;

    assert!(!outcome.is_success());
    assert_eq!(site.state(), CallState::FailedTerminal);
}

#[tokio::test]
async fn missing_session_fails_without_retry_or_request() {
    let server = start_rpc_mock().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let client = rpc_client(&server);
    let store = Arc::new(portal_session::CookieJarStore::new(
        portal_session::CookiePolicy::development(),
    ));
    let exec = ActionExecutor::new(store, ClientMetadata::default());
    let ctx = AppContext::default();
    let policy = instant_policy();

    let mut site = CallSite::new(&ctx, &policy);
    let outcome: CallOutcome<Order> = site.run(|| attempt(&exec, &client, "svc/Any")).await;

    match outcome {
        CallOutcome::Failed { error, .. } => assert_eq!(error.code, ErrorCode::Unauthenticated),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn deadline_exceeded_pauses_until_refresh_succeeds() {
    let server = start_rpc_mock().await;
    mount_error(
        &server,
        "order.v1.OrderService/Get",
        408,
        "deadline_exceeded",
        "session deadline passed",
    )
    .await;
    mount_ok(&server, "auth.v1.AuthService/Refresh", json!({})).await;
    let client = rpc_client(&server);
    let exec = ActionExecutor::new(signed_in_jar("abc"), ClientMetadata::default());
    let queue = Arc::new(NotificationQueue::new());
    let ctx = AppContext::new(queue.clone());
    let policy = instant_policy();

    let mut first = CallSite::new(&ctx, &policy);
    let outcome: CallOutcome<Order> = first
        .run(|| attempt(&exec, &client, "order.v1.OrderService/Get"))
        .await;
    assert!(matches!(
        outcome,
        CallOutcome::Failed {
            disposition: Disposition::RefreshRequested,
            ..
        }
    ));
    assert!(ctx.needs_refresh());
    assert!(queue.is_empty());

    let mut second = CallSite::new(&ctx, &policy);
    let paused: CallOutcome<Order> = second
        .run(|| attempt(&exec, &client, "order.v1.OrderService/Get"))
        .await;
    assert_eq!(paused, CallOutcome::Paused);

    let driver = RefreshDriver {
        backoff: policy.retry.clone(),
        ..RefreshDriver::default()
    };
    driver
        .run(&ctx, || attempt(&exec, &client, "auth.v1.AuthService/Refresh"))
        .await
        .unwrap();
    assert!(ctx.enabled());
}

#[test]
fn default_retry_table_is_shared() {
    let policy = RetryPolicy::default();
    assert!(policy.should_retry(3, ErrorCode::Aborted));
    assert!(!policy.should_retry(4, ErrorCode::Aborted));
    assert!(!policy.should_retry(0, ErrorCode::Unauthenticated));
}
