//! What an outgoing call carries besides its payload.

use reqwest::RequestBuilder;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use portal_types::{ClientMetadata, FORWARDED_FOR_HEADER, REAL_IP_HEADER, SessionToken};

/// Credential and inbound metadata attached to one remote call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    pub token: Option<SessionToken>,
    pub metadata: ClientMetadata,
}

impl CallContext {
    #[must_use]
    pub fn new(token: Option<SessionToken>, metadata: ClientMetadata) -> Self {
        Self { token, metadata }
    }

    /// Transport headers for this call.
    ///
    /// Metadata values that are not valid header values are dropped rather
    /// than rewritten.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(token) = &self.token {
            match HeaderValue::from_str(&format!("Bearer {}", token.as_str())) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("Session token is not a valid header value; not attached"),
            }
        }

        if let Some(ip) = &self.metadata.ip {
            insert_verbatim(&mut headers, HeaderName::from_static(FORWARDED_FOR_HEADER), ip);
            insert_verbatim(&mut headers, HeaderName::from_static(REAL_IP_HEADER), ip);
        }
        if let Some(agent) = &self.metadata.user_agent {
            insert_verbatim(&mut headers, USER_AGENT, agent);
        }

        headers
    }

    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.headers(self.headers())
    }
}

fn insert_verbatim(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::debug!(header = %name, "Dropping unrepresentable forwarded header"),
    }
}
