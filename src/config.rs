//! Process configuration, resolved once at start-up.
//!
//! `main` loads `.env` with dotenvy, then clap reads flags and environment
//! variables into the `*Args` structs below. Those are converted into
//! immutable config values that get injected into the provider and server.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use crate::constants;

/// Opaque provider credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Blank strings count as "no key".
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into().trim().to_string();
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// Google Generative Language API key.
    #[arg(long, env = constants::API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,
    /// Model used for advice generation.
    #[arg(long, env = "HEALTHGENIE_MODEL", default_value = constants::DEFAULT_MODEL)]
    pub model: String,
    /// Base URL of the generative-text API.
    #[arg(long, env = "HEALTHGENIE_API_URL", default_value = constants::DEFAULT_API_URL)]
    pub api_url: String,
    /// Seconds to wait for the provider before giving up.
    #[arg(long, env = "HEALTHGENIE_TIMEOUT_SECS", default_value_t = constants::DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
    /// Sampling temperature passed to the model.
    #[arg(long, env = "HEALTHGENIE_TEMPERATURE", default_value_t = constants::DEFAULT_TEMPERATURE)]
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<ApiKey>,
    pub model: String,
    pub api_url: String,
    pub timeout: Duration,
    pub temperature: f32,
}

impl ProviderConfig {
    /// Configuration pointing at `api_url` with every other value defaulted.
    pub fn new(api_key: Option<ApiKey>, api_url: impl Into<String>) -> Self {
        Self {
            api_key,
            model: constants::DEFAULT_MODEL.to_string(),
            api_url: api_url.into(),
            timeout: Duration::from_secs(constants::DEFAULT_TIMEOUT_SECS),
            temperature: constants::DEFAULT_TEMPERATURE,
        }
    }
}

impl TryFrom<ProviderArgs> for ProviderConfig {
    type Error = anyhow::Error;

    fn try_from(args: ProviderArgs) -> Result<Self> {
        if args.timeout_secs == 0 {
            anyhow::bail!("--timeout-secs must be at least 1");
        }
        if !(0.0..=2.0).contains(&args.temperature) {
            anyhow::bail!("--temperature must be between 0.0 and 2.0");
        }
        let api_url = args.api_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&api_url).with_context(|| format!("Invalid API URL: {}", api_url))?;

        Ok(Self {
            api_key: args.api_key.and_then(ApiKey::new),
            model: args.model,
            api_url,
            timeout: Duration::from_secs(args.timeout_secs),
            temperature: args.temperature,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "HEALTHGENIE_HOST", default_value = constants::DEFAULT_HOST, help = "Address to bind the web server to.")]
    pub host: String,
    #[arg(long, env = "HEALTHGENIE_PORT", default_value_t = constants::DEFAULT_PORT, help = "Port for the web server.")]
    pub port: u16,
    #[arg(long, default_value = constants::DEFAULT_TEMPLATES_DIR, help = "Directory holding the page templates.")]
    pub templates_dir: PathBuf,
    #[arg(long, default_value = constants::DEFAULT_STATIC_DIR, help = "Directory served under /static.")]
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub addr: SocketAddr,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl TryFrom<ServeArgs> for ServeConfig {
    type Error = anyhow::Error;

    fn try_from(args: ServeArgs) -> Result<Self> {
        let addr = format!("{}:{}", args.host, args.port)
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid bind address {}:{}", args.host, args.port))?;
        Ok(Self {
            addr,
            templates_dir: args.templates_dir,
            static_dir: args.static_dir,
        })
    }
}
