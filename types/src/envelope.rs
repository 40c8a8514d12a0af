//! The discriminated success/failure wrapper returned by an action.
//!
//! On the wire an envelope is
//!
//! ```text
//! { "success": true,  "data": <T> }
//! { "success": false, "error": { "code", "rawMessage", "message" } }
//! ```

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{MessageOverrides, NormalizedError};

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success { data: T },
    Failure { error: NormalizedError },
}

/// The envelope that actually crosses the boundary: data is plain JSON.
pub type PlainEnvelope = Envelope<Value>;

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self::Success { data }
    }

    pub fn failure(error: NormalizedError) -> Self {
        Self::Failure { error }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn error(&self) -> Option<&NormalizedError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, NormalizedError> {
        match self {
            Self::Success { data } => Ok(data),
            Self::Failure { error } => Err(error),
        }
    }

    /// Apply call-site message overrides to a failure; successes pass through.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &MessageOverrides) -> Self {
        if let Self::Failure { error } = &mut self {
            overrides.apply(error);
        }
        self
    }
}

impl<T> From<Result<T, NormalizedError>> for Envelope<T> {
    fn from(result: Result<T, NormalizedError>) -> Self {
        match result {
            Ok(data) => Self::Success { data },
            Err(error) => Self::Failure { error },
        }
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Envelope", 2)?;
        match self {
            Self::Success { data } => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            Self::Failure { error } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

#[derive(Deserialize)]
struct WireEnvelope {
    success: bool,
    #[serde(default)]
    data: Value,
    error: Option<NormalizedError>,
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Envelope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireEnvelope::deserialize(deserializer)?;
        if wire.success {
            let data = T::deserialize(wire.data).map_err(de::Error::custom)?;
            Ok(Self::Success { data })
        } else {
            let error = wire
                .error
                .ok_or_else(|| de::Error::missing_field("error"))?;
            Ok(Self::Failure { error })
        }
    }
}
