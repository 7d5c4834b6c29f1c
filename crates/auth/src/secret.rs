//! Signing secret sourcing.
//!
//! The secret is read once at startup and never mutated afterwards. A
//! configured secret always wins; the insecure development default is only
//! used when nothing is configured and the caller explicitly allows it.

use std::sync::Arc;

use thiserror::Error;

/// Clearly-marked non-production fallback secret.
pub const INSECURE_DEV_SECRET: &str = "gatehouse-insecure-dev-secret-do-not-use-in-production";

const RECOMMENDED_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("signing secret '{0}' is not configured")]
    Missing(String),
}

/// HMAC signing secret. Cheap to clone; `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret {
    bytes: Arc<[u8]>,
    insecure_default: bool,
}

impl SigningSecret {
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        Self {
            bytes: Arc::from(bytes.as_ref()),
            insecure_default: false,
        }
    }

    fn insecure_default() -> Self {
        Self {
            bytes: Arc::from(INSECURE_DEV_SECRET.as_bytes()),
            insecure_default: true,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True when this is the development fallback rather than a configured value.
    pub fn is_insecure_default(&self) -> bool {
        self.insecure_default
    }
}

impl core::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Supplies the signing secret at startup.
pub trait SecretProvider: Send + Sync {
    fn secret(&self) -> Result<SigningSecret, SecretError>;
}

/// Reads the secret from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvSecretProvider {
    var: String,
    allow_insecure_default: bool,
}

impl EnvSecretProvider {
    pub fn new(var: impl Into<String>, allow_insecure_default: bool) -> Self {
        Self {
            var: var.into(),
            allow_insecure_default,
        }
    }

    /// Resolve a raw (possibly unset) value into a secret.
    ///
    /// Empty values count as unset.
    pub fn resolve(&self, value: Option<String>) -> Result<SigningSecret, SecretError> {
        match value.filter(|v| !v.is_empty()) {
            Some(v) => {
                if v.len() < RECOMMENDED_LEN {
                    tracing::warn!(
                        var = %self.var,
                        "signing secret is shorter than recommended ({RECOMMENDED_LEN} bytes)"
                    );
                }
                Ok(SigningSecret::new(v))
            }
            None if self.allow_insecure_default => {
                tracing::warn!(var = %self.var, "signing secret not set; using insecure dev default");
                Ok(SigningSecret::insecure_default())
            }
            None => Err(SecretError::Missing(self.var.clone())),
        }
    }
}

impl SecretProvider for EnvSecretProvider {
    fn secret(&self) -> Result<SigningSecret, SecretError> {
        self.resolve(std::env::var(&self.var).ok())
    }
}

/// A fixed secret (tests, embedding).
#[derive(Debug, Clone)]
pub struct StaticSecretProvider(SigningSecret);

impl StaticSecretProvider {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self(SigningSecret::new(secret))
    }
}

impl SecretProvider for StaticSecretProvider {
    fn secret(&self) -> Result<SigningSecret, SecretError> {
        Ok(self.0.clone())
    }
}
