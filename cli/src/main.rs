//! Portal CLI - drives the server-action boundary from a terminal.
//!
//! # Architecture
//!
//! ```text
//! main() -> PortalConfig::load() -> FileCredentialStore + RpcClient
//!                                          |
//!                                          v
//!                 CallSite::run -> ActionExecutor::execute -> envelope on stdout
//! ```
//!
//! stdout carries only JSON; logs go to stderr, filtered by `RUST_LOG`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use portal_action::{
    ActionExecutor, ActionOptions, AppContext, CallOutcome, CallSite, LogNotifier,
};
use portal_config::PortalConfig;
use portal_remote::{RpcClient, RpcClientConfig};
use portal_session::FileCredentialStore;
use portal_types::{ClientMetadata, Credential, Envelope, PlainEnvelope, SessionToken};

#[derive(Debug, Parser)]
#[command(
    name = "portal",
    version,
    about = "Call the Portal RPC service through the action boundary"
)]
struct Cli {
    /// RPC base URL; overrides `[remote] base_url`.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Session file; overrides `[session] store_path`.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store a session token issued by the service
    SignIn {
        #[arg(long)]
        token: String,
        /// Seconds until the session expires
        #[arg(long, default_value_t = 86_400, value_parser = clap::value_parser!(i64).range(1..))]
        expires_in: i64,
    },

    /// Forget the stored session
    SignOut,

    /// Show whether a session is stored
    Status,

    /// Invoke a unary method (`service/Method`) and print its envelope
    Call {
        method: String,
        /// Request message as JSON
        #[arg(long, default_value = "{}")]
        params: String,
        /// Do not attach the session token
        #[arg(long)]
        public: bool,
        /// Client IP to forward
        #[arg(long)]
        ip: Option<String>,
        /// User agent to forward
        #[arg(long)]
        user_agent: Option<String>,
        /// Inbound request header (`name: value`) to derive client metadata
        /// from; `--ip` and `--user-agent` take precedence
        #[arg(long = "inbound-header", value_name = "NAME: VALUE")]
        inbound_headers: Vec<String>,
    },
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    let config = PortalConfig::load()
        .context("failed to load configuration")?
        .unwrap_or_default();

    let store_path = cli
        .store
        .clone()
        .or_else(|| config.store_path())
        .ok_or_else(|| anyhow!("could not determine a session file; pass --store"))?;
    let store = Arc::new(FileCredentialStore::new(store_path, config.cookie_policy()));

    match cli.command {
        Command::SignIn { token, expires_in } => {
            let token = SessionToken::new(token).context("--token must not be empty")?;
            let credential = Credential::new(token, session_expiry(Utc::now(), expires_in)?);
            executor(store, ClientMetadata::default(), &config)
                .sign_in(&credential)
                .context("failed to store session")?;
            print_json(&json!({ "signedIn": true, "expiresAt": credential.expires_at }))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::SignOut => {
            executor(store, ClientMetadata::default(), &config)
                .sign_out()
                .context("failed to clear session")?;
            print_json(&json!({ "signedIn": false }))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            let path = store.path().display().to_string();
            let exec = executor(store, ClientMetadata::default(), &config);
            print_json(&json!({
                "hasSession": exec.has_session(),
                "store": path,
                "baseUrl": rpc_config(cli.base_url.as_deref(), &config).map(|c| c.base_url),
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Call {
            method,
            params,
            public,
            ip,
            user_agent,
            inbound_headers,
        } => {
            let params: Value =
                serde_json::from_str(&params).context("--params is not valid JSON")?;
            let rpc = rpc_config(cli.base_url.as_deref(), &config).ok_or_else(|| {
                anyhow!("no RPC endpoint configured; set [remote] base_url or pass --base-url")
            })?;
            let client = RpcClient::new(&rpc)?;
            let inbound = inbound_metadata(&inbound_headers)?;
            let metadata = ClientMetadata {
                ip: ip.or(inbound.ip),
                user_agent: user_agent.or(inbound.user_agent),
            };
            let exec = executor(store, metadata, &config);
            let options = if public {
                ActionOptions::public()
            } else {
                ActionOptions::authenticated()
            };

            let ctx = AppContext::new(Arc::new(LogNotifier));
            let policy = config.call_policy();
            let mut site = CallSite::new(&ctx, &policy);

            let client = &client;
            let method = method.as_str();
            let params = &params;
            let outcome: CallOutcome<Value> = site
                .run(|| {
                    exec.execute(&options, move |cx| async move {
                        client.unary_value(method, params, &cx).await
                    })
                })
                .await;

            let (envelope, code): (PlainEnvelope, ExitCode) = match outcome {
                CallOutcome::Succeeded(data) => (Envelope::success(data), ExitCode::SUCCESS),
                CallOutcome::Failed { error, .. } => (Envelope::failure(error), ExitCode::FAILURE),
                CallOutcome::Paused => {
                    return Err(anyhow!("calls are paused pending a session refresh"));
                }
            };
            if ctx.needs_refresh() {
                tracing::warn!("Session needs a refresh; sign in again");
            }
            print_json(&envelope)?;
            Ok(code)
        }
    }
}

fn executor(
    store: Arc<FileCredentialStore>,
    metadata: ClientMetadata,
    config: &PortalConfig,
) -> ActionExecutor {
    ActionExecutor::new(store, metadata).with_signatures(config.session_signatures())
}

fn session_expiry(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_seconds(expires_in)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| anyhow!("--expires-in is out of range"))
}

/// Parse `name: value` pairs and read client metadata from them.
fn inbound_metadata(headers: &[String]) -> Result<ClientMetadata> {
    let pairs = headers
        .iter()
        .map(|raw| parse_header(raw))
        .collect::<Result<Vec<_>>>()?;

    Ok(ClientMetadata::from_headers(|name| {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }))
}

fn parse_header(raw: &str) -> Result<(String, &str)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("--inbound-header {raw:?} is not `name: value`"))?;
    Ok((name.trim().to_ascii_lowercase(), value.trim()))
}

fn rpc_config(base_url: Option<&str>, config: &PortalConfig) -> Option<RpcClientConfig> {
    let from_config = config.rpc_client_config();
    match base_url {
        Some(url) => {
            let mut rpc = from_config.unwrap_or_else(|| RpcClientConfig::new(url));
            rpc.base_url = url.to_string();
            Some(rpc)
        }
        None => from_config,
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
