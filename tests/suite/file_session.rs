//! On-disk session store through the executor

use std::sync::Arc;

use serde_json::json;
use tempfile::tempdir;

use portal_action::{ActionExecutor, ActionOptions};
use portal_config::PortalConfig;
use portal_session::{CookiePolicy, CredentialStore, FileCredentialStore};
use portal_types::{ClientMetadata, ErrorCode};

use crate::common::{credential, mount_error, mount_ok, rpc_client, start_rpc_mock};

#[tokio::test]
async fn sign_in_persists_across_processes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let first = ActionExecutor::new(
        Arc::new(FileCredentialStore::new(&path, CookiePolicy::development())),
        ClientMetadata::default(),
    );
    first.sign_in(&credential("abc")).unwrap();

    // A fresh store over the same file stands in for the next invocation.
    let reopened = Arc::new(FileCredentialStore::new(&path, CookiePolicy::development()));
    assert!(reopened.has_session());
    assert_eq!(reopened.get().unwrap().as_str(), "abc");

    let server = start_rpc_mock().await;
    mount_ok(&server, "svc/Ping", json!({"pong": true})).await;
    let client = rpc_client(&server);
    let exec = ActionExecutor::new(reopened, ClientMetadata::default());
    let envelope = exec
        .execute(&ActionOptions::authenticated(), |cx| async move {
            client.unary_value("svc/Ping", &json!({}), &cx).await
        })
        .await;
    assert!(envelope.is_success());
}

#[tokio::test]
async fn configured_signature_evicts_file_session() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let config: PortalConfig =
        toml::from_str("[session]\ninvalid_signatures = [\"token revoked by admin\"]").unwrap();

    let store = Arc::new(FileCredentialStore::new(&path, config.cookie_policy()));
    store.set(&credential("abc")).unwrap();

    let server = start_rpc_mock().await;
    mount_error(
        &server,
        "svc/Ping",
        401,
        "unauthenticated",
        "Token revoked by admin",
    )
    .await;
    let client = rpc_client(&server);
    let exec = ActionExecutor::new(store.clone(), ClientMetadata::default())
        .with_signatures(config.session_signatures());

    let envelope = exec
        .execute(&ActionOptions::authenticated(), |cx| async move {
            client.unary_value("svc/Ping", &json!({}), &cx).await
        })
        .await;

    assert_eq!(envelope.error().unwrap().code, ErrorCode::Unauthenticated);
    assert!(!path.exists());
    assert!(!store.has_session());
}

#[test]
fn corrupt_file_reads_as_signed_out() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{not json").unwrap();

    let store = FileCredentialStore::new(&path, CookiePolicy::default());
    assert!(store.get().is_err_and(|e| e.is_absent()));
    assert!(!store.has_session());

    store.set(&credential("fresh")).unwrap();
    assert_eq!(store.get().unwrap().as_str(), "fresh");
}
