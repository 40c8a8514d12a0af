//! Configuration for Portal.
//!
//! Read from `$PORTAL_CONFIG`, else `~/.portal/config.toml`. A missing file
//! means defaults throughout.
//!
//! ```toml
//! [remote]
//! base_url = "${PORTAL_RPC_URL}"
//! timeout_secs = 30
//!
//! [session]
//! secure = true
//! invalid_signatures = ["session not found", "session expired"]
//!
//! [retry]
//! max_failures = 3
//! initial_delay_ms = 1000
//!
//! [notifications]
//! connectivity_message = "You appear to be offline."
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

use portal_action::{
    CallPolicy, MAX_FAILURES_LIMIT, NoticePolicy, RetryPolicy, SessionSignatures,
};
use portal_remote::RpcClientConfig;
use portal_session::CookiePolicy;

pub const CONFIG_ENV: &str = "PORTAL_CONFIG";
pub const ENVIRONMENT_ENV: &str = "PORTAL_ENV";

const CONFIG_DIR: &str = ".portal";
const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoteConfig {
    /// Supports `${ENV_VAR}` expansion.
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub allow_http: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionConfig {
    /// Defaults to true unless `PORTAL_ENV=development`.
    pub secure: Option<bool>,
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Supports `${ENV_VAR}` expansion.
    pub store_path: Option<String>,
    pub invalid_signatures: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetryConfig {
    pub max_failures: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub jitter_factor: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationsConfig {
    pub noise_messages: Option<Vec<String>>,
    pub connectivity_message: Option<String>,
}

/// Replace `${VAR}` with the variable's value (empty when unset).
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + end_rel];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + end_rel + 1..];
    }

    out.push_str(rest);
    out
}

/// `Secure` cookies everywhere except an explicit development environment.
#[must_use]
pub fn secure_by_default(environment: Option<&str>) -> bool {
    !matches!(environment.map(str::trim), Some(env) if env.eq_ignore_ascii_case("development"))
}

impl PortalConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    /// `Ok(None)` when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        warn_if_writable_by_others(path);

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// `None` when no base URL is configured.
    #[must_use]
    pub fn rpc_client_config(&self) -> Option<RpcClientConfig> {
        let base_url = self
            .remote
            .base_url
            .as_deref()
            .map(expand_env_vars)
            .filter(|url| !url.trim().is_empty())?;

        let mut config = RpcClientConfig::new(base_url);
        if let Some(secs) = self.remote.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        config.allow_http = self.remote.allow_http;
        Some(config)
    }

    #[must_use]
    pub fn cookie_policy(&self) -> CookiePolicy {
        let defaults = CookiePolicy::default();
        let environment = env::var(ENVIRONMENT_ENV).ok();
        CookiePolicy {
            secure: self
                .session
                .secure
                .unwrap_or_else(|| secure_by_default(environment.as_deref())),
            path: self.session.path.clone().unwrap_or(defaults.path),
            domain: self.session.domain.clone(),
        }
    }

    #[must_use]
    pub fn store_path(&self) -> Option<PathBuf> {
        match self.session.store_path.as_deref().map(expand_env_vars) {
            Some(path) if !path.trim().is_empty() => Some(PathBuf::from(path)),
            _ => default_store_path(),
        }
    }

    #[must_use]
    pub fn session_signatures(&self) -> SessionSignatures {
        match &self.session.invalid_signatures {
            Some(signatures) => SessionSignatures::new(signatures),
            None => SessionSignatures::default(),
        }
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        let retry = &self.retry;
        let max_failures = match retry.max_failures {
            Some(n) if n > MAX_FAILURES_LIMIT => {
                tracing::warn!(
                    max_failures = n,
                    limit = MAX_FAILURES_LIMIT,
                    "retry.max_failures above limit; using the limit"
                );
                MAX_FAILURES_LIMIT
            }
            Some(n) => n,
            None => defaults.max_failures,
        };
        let jitter_factor = match retry.jitter_factor {
            Some(f) if !f.is_finite() => {
                tracing::warn!("retry.jitter_factor is not a finite number; using the default");
                defaults.jitter_factor
            }
            Some(f) => f,
            None => defaults.jitter_factor,
        };
        RetryPolicy {
            max_failures,
            initial_delay: retry
                .initial_delay_ms
                .map_or(defaults.initial_delay, Duration::from_millis),
            max_delay: retry
                .max_delay_ms
                .map_or(defaults.max_delay, Duration::from_millis),
            jitter_factor,
        }
    }

    #[must_use]
    pub fn notice_policy(&self) -> NoticePolicy {
        let defaults = NoticePolicy::default();
        let notifications = &self.notifications;
        NoticePolicy {
            noise_messages: notifications
                .noise_messages
                .clone()
                .unwrap_or(defaults.noise_messages),
            connectivity_message: notifications
                .connectivity_message
                .clone()
                .unwrap_or(defaults.connectivity_message),
        }
    }

    #[must_use]
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            retry: self.retry_policy(),
            notices: self.notice_policy(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    match env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE)),
    }
}

pub fn default_store_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(SESSION_FILE))
}

// The config chooses where the session token is written, so a file others can
// edit is worth flagging.
#[cfg(unix)]
fn warn_if_writable_by_others(path: &Path) {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    let Ok(metadata) = fs::metadata(path) else {
        return;
    };
    let our_uid = unsafe { libc::getuid() };
    let mode = metadata.permissions().mode() & 0o777;
    if metadata.uid() != our_uid || mode & 0o022 != 0 {
        tracing::warn!(
            path = %path.display(),
            mode = %format!("{mode:o}"),
            "Config file is writable by other users"
        );
    }
}

#[cfg(not(unix))]
fn warn_if_writable_by_others(_path: &Path) {}
