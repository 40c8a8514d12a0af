use serde::{Deserialize, Serialize};

pub const REAL_IP_HEADER: &str = "x-real-ip";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const USER_AGENT_HEADER: &str = "user-agent";

/// Network attributes of the inbound browser request.
///
/// Taken verbatim from the inbound headers and forwarded on every outgoing
/// remote call. Never generated or validated here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetadata {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientMetadata {
    /// Build from a header lookup (name is lowercase).
    ///
    /// The IP prefers `x-real-ip`, falling back to the first non-empty entry
    /// of `x-forwarded-for`.
    pub fn from_headers<'a>(header: impl Fn(&str) -> Option<&'a str>) -> Self {
        let ip = header(REAL_IP_HEADER)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .or_else(|| {
                header(FORWARDED_FOR_HEADER).and_then(|list| {
                    list.split(',')
                        .map(str::trim)
                        .find(|entry| !entry.is_empty())
                })
            })
            .map(ToString::to_string);

        let user_agent = header(USER_AGENT_HEADER)
            .filter(|value| !value.trim().is_empty())
            .map(ToString::to_string);

        Self { ip, user_agent }
    }
}
