//! Configuration for the club session server

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::secret::{resolve_secret, Secret, SecretSource};
use crate::session::{KioskPrincipal, MemberPrincipal, Principal, SessionSettings};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Production-like deployment: session cookies get the `Secure` flag.
    /// Set via config file or `CLUB_ENV=production`.
    #[serde(default)]
    pub production: bool,

    /// Shared signing secret, lowest priority after the environment.
    /// Prefer `CLUB_SESSION_SECRET` (or the per-kind variables) in deployments.
    #[serde(default)]
    pub session_secret: Option<String>,

    /// Maximum number of requests served concurrently
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Log level filter string.
    /// Set via config file or CLUB_LOG_LEVEL env var. Overridden by RUST_LOG.
    /// Default: "club_session=debug,tower_http=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Kiosk session settings and event credentials
    #[serde(default)]
    pub kiosk: KioskConfig,

    /// Member session settings and accounts
    #[serde(default)]
    pub member: MemberConfig,
}

/// Kiosk sessions: one event per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KioskConfig {
    /// Session lifetime, humantime syntax ("12h", "90m")
    #[serde(default = "default_kiosk_lifetime")]
    pub lifetime: String,

    #[serde(default = "default_kiosk_cookie")]
    pub cookie_name: String,

    /// Events a kiosk may sign in to
    #[serde(default)]
    pub events: Vec<KioskEvent>,
}

/// An event and the bcrypt hash of its kiosk PIN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KioskEvent {
    pub event_code: String,
    pub pin_hash: String,
}

/// Member sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberConfig {
    /// Session lifetime, humantime syntax ("7d", "30d")
    #[serde(default = "default_member_lifetime")]
    pub lifetime: String,

    #[serde(default = "default_member_cookie")]
    pub cookie_name: String,

    /// Members allowed to sign in
    #[serde(default)]
    pub accounts: Vec<MemberAccount>,
}

/// A member account and the bcrypt hash of its password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberAccount {
    pub member_id: String,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
}

// Default value functions for serde
fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_concurrent_requests() -> usize {
    1024
}

fn default_log_level() -> String {
    "club_session=debug,tower_http=debug".to_string()
}

fn default_kiosk_lifetime() -> String {
    humantime::format_duration(KioskPrincipal::DEFAULT_TTL).to_string()
}

fn default_member_lifetime() -> String {
    humantime::format_duration(MemberPrincipal::DEFAULT_TTL).to_string()
}

fn default_kiosk_cookie() -> String {
    KioskPrincipal::COOKIE_NAME.to_string()
}

fn default_member_cookie() -> String {
    MemberPrincipal::COOKIE_NAME.to_string()
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            lifetime: default_kiosk_lifetime(),
            cookie_name: default_kiosk_cookie(),
            events: Vec::new(),
        }
    }
}

impl Default for MemberConfig {
    fn default() -> Self {
        Self {
            lifetime: default_member_lifetime(),
            cookie_name: default_member_cookie(),
            accounts: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            production: false,
            session_secret: None,
            max_concurrent_requests: default_max_concurrent_requests(),
            log_level: default_log_level(),
            kiosk: KioskConfig::default(),
            member: MemberConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("CLUB_LISTEN_ADDR") {
            if let Ok(parsed) = addr.parse() {
                config.listen_addr = parsed;
            }
        }

        if let Ok(lifetime) = std::env::var("CLUB_KIOSK_LIFETIME") {
            config.kiosk.lifetime = lifetime;
        }

        if let Ok(lifetime) = std::env::var("CLUB_MEMBER_LIFETIME") {
            config.member.lifetime = lifetime;
        }

        if let Ok(level) = std::env::var("CLUB_LOG_LEVEL") {
            config.log_level = level;
        }

        config.apply_env_overrides();
        config
    }

    /// Load configuration from file if it exists, otherwise from environment
    pub fn load() -> Self {
        // Try config file first
        if let Ok(path) = std::env::var("CLUB_CONFIG") {
            if let Ok(mut config) = Self::from_file(&path) {
                config.apply_env_overrides();
                return config;
            }
        }

        // Try default config file locations
        for path in &["club_session.toml", "/etc/club_session/config.toml"] {
            if std::path::Path::new(path).exists() {
                if let Ok(mut config) = Self::from_file(path) {
                    config.apply_env_overrides();
                    return config;
                }
            }
        }

        // Fall back to environment variables
        Self::from_env()
    }

    /// Deployment flags that always come from the environment when present.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(env) = std::env::var("CLUB_ENV") {
            self.production = is_production(&env);
        }
    }

    /// Ordered candidates for the kiosk signing secret.
    pub fn kiosk_secret_sources(&self) -> Vec<SecretSource> {
        self.secret_sources("CLUB_KIOSK_SECRET")
    }

    /// Ordered candidates for the member signing secret.
    pub fn member_secret_sources(&self) -> Vec<SecretSource> {
        self.secret_sources("CLUB_MEMBER_SECRET")
    }

    fn secret_sources(&self, kind_var: &str) -> Vec<SecretSource> {
        vec![
            SecretSource::from_env(kind_var),
            SecretSource::from_env("CLUB_SESSION_SECRET"),
            SecretSource::new("config:session_secret", self.session_secret.clone()),
        ]
    }

    /// Resolve the kiosk signing secret; fails when every source is empty.
    pub fn kiosk_secret(&self) -> Result<Secret, ConfigError> {
        resolve_secret(KioskPrincipal::KIND, &self.kiosk_secret_sources())
    }

    /// Resolve the member signing secret; fails when every source is empty.
    pub fn member_secret(&self) -> Result<Secret, ConfigError> {
        resolve_secret(MemberPrincipal::KIND, &self.member_secret_sources())
    }

    pub fn kiosk_settings(&self) -> Result<SessionSettings, ConfigError> {
        Ok(SessionSettings {
            cookie_name: self.kiosk.cookie_name.clone(),
            lifetime: parse_lifetime(&self.kiosk.lifetime)?,
            production: self.production,
        })
    }

    pub fn member_settings(&self) -> Result<SessionSettings, ConfigError> {
        Ok(SessionSettings {
            cookie_name: self.member.cookie_name.clone(),
            lifetime: parse_lifetime(&self.member.lifetime)?,
            production: self.production,
        })
    }

    /// Serialize config to TOML string (excludes session_secret for security).
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        let mut export = self.clone();
        export.session_secret = None;
        toml::to_string_pretty(&export).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Shortest lifetime a session may be configured with.
const MIN_SESSION_LIFETIME: Duration = Duration::from_secs(1);

fn is_production(env: &str) -> bool {
    matches!(env.trim().to_ascii_lowercase().as_str(), "production" | "prod")
}

/// Parse a humantime lifetime. Anything under one second is rejected: the
/// cookie `Max-Age` counts whole seconds and `Max-Age=0` deletes the cookie.
fn parse_lifetime(value: &str) -> Result<Duration, ConfigError> {
    let lifetime = humantime::parse_duration(value)
        .map_err(|e| ConfigError::InvalidLifetime(format!("{:?}: {}", value, e)))?;
    if lifetime < MIN_SESSION_LIFETIME {
        return Err(ConfigError::InvalidLifetime(format!(
            "{:?}: must be at least one second",
            value
        )));
    }
    Ok(lifetime)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("no {kind} session secret configured: set CLUB_SESSION_SECRET")]
    MissingSecret { kind: String },

    #[error("Invalid session lifetime {0}")]
    InvalidLifetime(String),
}
