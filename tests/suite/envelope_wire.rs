//! Envelope JSON as seen by the browser

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use portal_action::{decode, encode};
use portal_types::{Envelope, ErrorCode, NormalizedError, PlainEnvelope, RemoteError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Invoice {
    number: String,
    line_items: Vec<LineItem>,
    paid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LineItem {
    sku: String,
    quantity: u32,
}

fn invoice() -> Invoice {
    Invoice {
        number: "INV-7".to_string(),
        line_items: vec![LineItem {
            sku: "A-1".to_string(),
            quantity: 2,
        }],
        paid: false,
    }
}

#[tokio::test]
async fn success_shape() {
    let envelope = encode(async { Ok::<_, RemoteError>(invoice()) }).await;
    let wire = serde_json::to_value(&envelope).unwrap();

    assert_eq!(
        wire,
        json!({
            "success": true,
            "data": {
                "number": "INV-7",
                "lineItems": [{"sku": "A-1", "quantity": 2}],
                "paid": false
            }
        })
    );
}

#[tokio::test]
async fn failure_shape() {
    let envelope = encode(async {
        Err::<Invoice, _>(RemoteError::status(ErrorCode::FailedPrecondition, "invoice locked"))
    })
    .await;
    let wire = serde_json::to_value(&envelope).unwrap();

    assert_eq!(
        wire,
        json!({
            "success": false,
            "error": {
                "code": "failed_precondition",
                "rawMessage": "invoice locked",
                "message": "invoice locked"
            }
        })
    );
}

#[tokio::test]
async fn browser_side_decode_matches_server_side_value() {
    let envelope = encode(async { Ok::<_, RemoteError>(invoice()) }).await;
    let text = serde_json::to_string(&envelope).unwrap();

    let received: PlainEnvelope = serde_json::from_str(&text).unwrap();
    assert_eq!(decode::<Invoice>(received).unwrap(), invoice());
}

#[test]
fn success_without_data_is_null() {
    let received: PlainEnvelope = serde_json::from_str(r#"{"success": true}"#).unwrap();
    assert_eq!(received, Envelope::success(Value::Null));
}

#[test]
fn failure_from_the_wire_reraises_with_its_code() {
    let received: PlainEnvelope = serde_json::from_str(
        r#"{"success": false, "error": {"code": "resource_exhausted", "rawMessage": "quota", "message": "Slow down"}}"#,
    )
    .unwrap();

    let error: NormalizedError = decode::<Value>(received).unwrap_err();
    assert_eq!(error.message, "Slow down");
    assert_eq!(RemoteError::from(error).code(), ErrorCode::ResourceExhausted);
}
