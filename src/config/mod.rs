//! Configuration management
//!
//! All settings come from environment variables. Required provider values
//! default to empty strings so the gateway still starts when they are
//! missing; `/api/health` reports the gap instead.

use config::{ConfigError, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub twilio: TwilioConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub mode: RuntimeMode,
    pub static_dir: PathBuf,
}

/// Runtime mode, controls how much error detail reaches API callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Development,
    Production,
}

impl RuntimeMode {
    /// Parse `APP_ENV`; anything but production means development
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => RuntimeMode::Production,
            _ => RuntimeMode::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, RuntimeMode::Production)
    }
}

/// Telephony provider account settings
#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub phone_number: String,
    pub twiml_app_sid: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

impl TwilioConfig {
    /// True when all four required account values are non-empty.
    /// Does not check them against the provider.
    pub fn is_configured(&self) -> bool {
        [
            &self.account_sid,
            &self.auth_token,
            &self.phone_number,
            &self.twiml_app_sid,
        ]
        .iter()
        .all(|value| !value.trim().is_empty())
    }

    /// Key SID and secret used to sign access tokens.
    ///
    /// A dedicated API key pair wins over the account credentials.
    pub fn signing_key(&self) -> (&str, &str) {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) => (key.as_str(), secret.as_str()),
            _ => (self.account_sid.as_str(), self.auth_token.as_str()),
        }
    }
}

impl fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &redact(&self.auth_token))
            .field("phone_number", &self.phone_number)
            .field("twiml_app_sid", &self.twiml_app_sid)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_deref().map(redact))
            .field("api_base_url", &self.api_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

/// Gateway behaviour settings
#[derive(Clone)]
pub struct GatewayConfig {
    pub token_ttl_secs: u64,
    pub incoming_client_identity: String,
    pub record_outbound_calls: bool,
    /// Bearer token required on caller-facing endpoints when set
    pub api_auth_token: Option<String>,
    /// Public base URL of this gateway; enables webhook signature checks
    pub webhook_base_url: Option<String>,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("incoming_client_identity", &self.incoming_client_identity)
            .field("record_outbound_calls", &self.record_outbound_calls)
            .field("api_auth_token", &self.api_auth_token.as_deref().map(redact))
            .field("webhook_base_url", &self.webhook_base_url)
            .finish()
    }
}

/// Flat view of the environment, one field per variable
#[derive(Debug, Deserialize)]
struct EnvSettings {
    #[serde(default)]
    twilio_account_sid: String,
    #[serde(default)]
    twilio_auth_token: String,
    #[serde(default)]
    twilio_phone_number: String,
    #[serde(default)]
    twilio_twiml_app_sid: String,
    twilio_api_key: Option<String>,
    twilio_api_secret: Option<String>,
    #[serde(default = "default_api_base_url")]
    twilio_api_base_url: String,
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    app_env: String,
    #[serde(default = "default_static_dir")]
    static_dir: String,
    #[serde(default = "default_token_ttl")]
    token_ttl_secs: u64,
    #[serde(default = "default_incoming_identity")]
    incoming_client_identity: String,
    #[serde(default = "default_record_calls")]
    record_outbound_calls: bool,
    api_auth_token: Option<String>,
    webhook_base_url: Option<String>,
    #[serde(default = "default_timeout")]
    provider_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> String {
    "public".to_string()
}

fn default_token_ttl() -> u64 {
    3600
}

fn default_incoming_identity() -> String {
    "browser-client".to_string()
}

fn default_record_calls() -> bool {
    true
}

fn default_timeout() -> u64 {
    10
}

/// Empty optional variables behave as unset
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<EnvSettings> for Config {
    fn from(env: EnvSettings) -> Self {
        Self {
            server: ServerConfig {
                host: env.host,
                port: env.port,
                mode: RuntimeMode::parse(&env.app_env),
                static_dir: PathBuf::from(env.static_dir),
            },
            twilio: TwilioConfig {
                account_sid: env.twilio_account_sid,
                auth_token: env.twilio_auth_token,
                phone_number: env.twilio_phone_number,
                twiml_app_sid: env.twilio_twiml_app_sid,
                api_key: non_empty(env.twilio_api_key),
                api_secret: non_empty(env.twilio_api_secret),
                api_base_url: env.twilio_api_base_url,
                timeout_secs: env.provider_timeout_secs,
            },
            gateway: GatewayConfig {
                token_ttl_secs: env.token_ttl_secs,
                incoming_client_identity: env.incoming_client_identity,
                record_outbound_calls: env.record_outbound_calls,
                api_auth_token: non_empty(env.api_auth_token),
                webhook_base_url: non_empty(env.webhook_base_url),
            },
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::build(Environment::default())
    }

    /// Load configuration from an explicit variable map (same keys as the environment)
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::build(Environment::default().source(Some(vars)))
    }

    fn build(source: Environment) -> Result<Self, ConfigError> {
        let settings: EnvSettings = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        Ok(settings.into())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                mode: RuntimeMode::Development,
                static_dir: PathBuf::from(default_static_dir()),
            },
            twilio: TwilioConfig {
                account_sid: String::new(),
                auth_token: String::new(),
                phone_number: String::new(),
                twiml_app_sid: String::new(),
                api_key: None,
                api_secret: None,
                api_base_url: default_api_base_url(),
                timeout_secs: default_timeout(),
            },
            gateway: GatewayConfig {
                token_ttl_secs: default_token_ttl(),
                incoming_client_identity: default_incoming_identity(),
                record_outbound_calls: default_record_calls(),
                api_auth_token: None,
                webhook_base_url: None,
            },
        }
    }
}
