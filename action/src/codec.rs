//! Conversion between a unit of remote work and its transport-safe envelope.
//!
//! [`encode`] never lets a raised failure escape: whatever happens becomes a
//! value. [`decode`] turns that value back into `Result`, so call sites branch
//! on the same [`ErrorCode`] regardless of which side of the boundary they run
//! on.

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use portal_types::{Envelope, ErrorCode, NormalizedError, PlainEnvelope, RemoteError, classify};

/// Reduce a result to plain JSON. Anything that cannot be represented becomes
/// an `Internal` failure rather than crossing the boundary.
pub fn to_plain<T: Serialize>(data: &T) -> Result<Value, NormalizedError> {
    serde_json::to_value(data).map_err(|e| {
        NormalizedError::new(
            ErrorCode::Internal,
            format!("action result is not serializable: {e}"),
        )
    })
}

/// Await `run` and wrap its outcome.
pub async fn encode<T, Fut>(run: Fut) -> PlainEnvelope
where
    T: Serialize,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    match run.await {
        Ok(data) => to_plain(&data).into(),
        Err(raised) => Envelope::failure(classify(&raised)),
    }
}

/// Unwrap an envelope into the caller's type, or the failure it carries.
pub fn decode<T: DeserializeOwned>(envelope: PlainEnvelope) -> Result<T, NormalizedError> {
    match envelope {
        Envelope::Success { data } => serde_json::from_value(data).map_err(|e| {
            NormalizedError::new(
                ErrorCode::Internal,
                format!("unexpected action result shape: {e}"),
            )
        }),
        Envelope::Failure { error } => Err(error),
    }
}
