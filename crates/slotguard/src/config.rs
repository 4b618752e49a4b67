//! Gate configuration.

use slotguard_credentials::{SessionKey, BOOTSTRAP_TOKEN_TTL_MS, SESSION_TTL_MS};

use crate::error::{GateError, Result};

/// Origin used to build first-login links when none is configured.
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Path of the first-login page, relative to the origin.
pub const FIRST_LOGIN_PATH: &str = "/auth/first-login";

/// Environment variable names read by [`GateConfig::from_env`].
pub const ENV_ORIGIN: &str = "SLOTGUARD_ORIGIN";
pub const ENV_SESSION_SECRET: &str = "SLOTGUARD_SESSION_SECRET";
pub const ENV_SESSION_TTL_SECS: &str = "SLOTGUARD_SESSION_TTL_SECS";

/// Configuration for the Gate.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Public origin of the application, e.g. `https://cms.example.com`.
    pub origin: String,
    /// Bootstrap token lifetime (ms).
    pub token_ttl_ms: i64,
    /// Session lifetime (ms).
    pub session_ttl_ms: i64,
    /// Key that signs session tokens.
    pub session_key: SessionKey,
}

impl Default for GateConfig {
    /// Local-development defaults with a random session key, so sessions do
    /// not survive a restart.
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            token_ttl_ms: BOOTSTRAP_TOKEN_TTL_MS,
            session_ttl_ms: SESSION_TTL_MS,
            session_key: SessionKey::generate(),
        }
    }
}

impl GateConfig {
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_token_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.token_ttl_ms = ttl_ms;
        self
    }

    pub fn with_session_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.session_ttl_ms = ttl_ms;
        self
    }

    pub fn with_session_key(mut self, key: SessionKey) -> Self {
        self.session_key = key;
        self
    }

    /// Defaults overridden by `SLOTGUARD_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading variables through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(origin) = lookup(ENV_ORIGIN).filter(|o| !o.trim().is_empty()) {
            config.origin = origin.trim().to_string();
        }

        match lookup(ENV_SESSION_SECRET) {
            Some(secret) => {
                config.session_key = SessionKey::from_hex(&secret)
                    .map_err(|e| GateError::Config(format!("{}: {}", ENV_SESSION_SECRET, e)))?;
            }
            None => tracing::warn!(
                "{} not set, sessions will not survive a restart",
                ENV_SESSION_SECRET
            ),
        }

        if let Some(secs) = lookup(ENV_SESSION_TTL_SECS) {
            let secs: i64 = secs
                .trim()
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| {
                    GateError::Config(format!("{} must be a positive integer", ENV_SESSION_TTL_SECS))
                })?;
            config.session_ttl_ms = secs.saturating_mul(1000);
        }

        Ok(config)
    }

    /// The link a provisioned user follows to set their password.
    pub fn first_login_url(&self, token: &str) -> String {
        format!(
            "{}{}?token={}",
            self.origin.trim_end_matches('/'),
            FIRST_LOGIN_PATH,
            token
        )
    }
}
