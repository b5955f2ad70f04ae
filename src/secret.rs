//! Signing secret and its resolution from an ordered list of sources.
//!
//! The secret is resolved once at startup and then shared read-only
//! (`Arc<Secret>`) by every issuer and authenticator. Nothing in here reads
//! the process environment; callers collect the candidate values first
//! (see `Config::secret_sources`) and hand them to [`resolve_secret`].

use std::fmt;
use zeroize::Zeroizing;

use crate::config::ConfigError;

/// HMAC key material. Never empty; zeroized on drop; redacted in `Debug`.
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    /// Build a secret from raw text. Empty or whitespace-only input is a
    /// deployment error, never a silent default. Otherwise the bytes are kept
    /// exactly as given, surrounding whitespace included.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ConfigError> {
        let value = value.as_ref();
        if value.trim().is_empty() {
            return Err(ConfigError::MissingSecret {
                kind: "session".to_string(),
            });
        }
        Ok(Self(Zeroizing::new(value.as_bytes().to_vec())))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// One named candidate for the signing secret (an env var, a config key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSource {
    pub name: String,
    pub value: Option<String>,
}

impl SecretSource {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Snapshot an environment variable as a source.
    pub fn from_env(name: &str) -> Self {
        Self::new(name, std::env::var(name).ok())
    }
}

/// Return the first source with a non-empty value.
///
/// `kind` only labels the error (`"kiosk"`, `"member"`).
pub fn resolve_secret(kind: &str, sources: &[SecretSource]) -> Result<Secret, ConfigError> {
    sources
        .iter()
        .find_map(|source| {
            let value = source.value.as_deref()?;
            let secret = Secret::new(value).ok()?;
            tracing::debug!("{} session secret resolved from {}", kind, source.name);
            Some(secret)
        })
        .ok_or_else(|| ConfigError::MissingSecret {
            kind: kind.to_string(),
        })
}
