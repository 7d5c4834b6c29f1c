//! Process configuration, read once at startup.
//!
//! The resulting [`AppConfig`] is immutable and shared by reference; nothing
//! in the gateway mutates configuration after boot.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::Duration as TokenTtl;
use thiserror::Error;

use gatehouse_auth::{EnvSecretProvider, SecretError, SecretProvider, SigningSecret};

pub const JWT_SECRET_VAR: &str = "JWT_SECRET";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {0}")]
    Invalid(&'static str),

    #[error(transparent)]
    Secret(#[from] SecretError),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    fn parse(raw: Option<&str>) -> Result<Self, ConfigError> {
        match raw.map(str::trim) {
            None | Some("") | Some("development") | Some("dev") => Ok(Environment::Development),
            Some("production") | Some("prod") => Ok(Environment::Production),
            Some(_) => Err(ConfigError::Invalid("GATEHOUSE_ENV")),
        }
    }

    /// Only non-production processes may boot on the insecure dev secret.
    pub fn allows_insecure_secret(self) -> bool {
        self == Environment::Development
    }
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub bind_addr: SocketAddr,
    pub secret: SigningSecret,
    /// Lifetime of issued tokens and of the session cookie.
    pub token_ttl: TokenTtl,
    /// Upper bound for any single directory call.
    pub directory_timeout: Duration,
    pub allowed_origin: String,
    pub cookie_secure: bool,
    /// Run the cross-account duplicate-password check on register.
    pub reject_shared_passwords: bool,
    /// Key for the Postgres password digest; defaults to the signing secret.
    pub password_pepper: SigningSecret,
    /// Postgres directory; in-memory when unset.
    pub database_url: Option<String>,
}

impl AppConfig {
    /// Defaults around an explicit secret (tests, embedding).
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            environment: Environment::Development,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            password_pepper: secret.clone(),
            secret,
            token_ttl: TokenTtl::minutes(60),
            directory_timeout: Duration::from_millis(5000),
            allowed_origin: "http://localhost:3000".to_string(),
            cookie_secure: false,
            reject_shared_passwords: true,
            database_url: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let environment = Environment::parse(lookup("GATEHOUSE_ENV").as_deref())?;
        let provider = EnvSecretProvider::new(JWT_SECRET_VAR, environment.allows_insecure_secret());
        Self::from_parts(environment, &lookup, &provider)
    }

    /// Build from an arbitrary key lookup and secret source.
    pub fn from_lookup<F>(lookup: F, secrets: &dyn SecretProvider) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = Environment::parse(lookup("GATEHOUSE_ENV").as_deref())?;
        Self::from_parts(environment, &lookup, secrets)
    }

    fn from_parts(
        environment: Environment,
        lookup: &dyn Fn(&str) -> Option<String>,
        secrets: &dyn SecretProvider,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::new(secrets.secret()?);
        config.environment = environment;

        if let Some(raw) = lookup("GATEHOUSE_BIND_ADDR") {
            config.bind_addr = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("GATEHOUSE_BIND_ADDR"))?;
        }

        if let Some(raw) = lookup("GATEHOUSE_TOKEN_TTL_MINUTES") {
            let minutes: i64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("GATEHOUSE_TOKEN_TTL_MINUTES"))?;
            if !(1..=7 * 24 * 60).contains(&minutes) {
                return Err(ConfigError::Invalid("GATEHOUSE_TOKEN_TTL_MINUTES"));
            }
            config.token_ttl = TokenTtl::minutes(minutes);
        }

        if let Some(raw) = lookup("GATEHOUSE_DIRECTORY_TIMEOUT_MS") {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("GATEHOUSE_DIRECTORY_TIMEOUT_MS"))?;
            if millis == 0 {
                return Err(ConfigError::Invalid("GATEHOUSE_DIRECTORY_TIMEOUT_MS"));
            }
            config.directory_timeout = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup("GATEHOUSE_ALLOWED_ORIGIN") {
            let origin = raw.trim();
            // Credentialed CORS cannot use a wildcard origin.
            if origin.is_empty() || origin == "*" || !origin.is_ascii() {
                return Err(ConfigError::Invalid("GATEHOUSE_ALLOWED_ORIGIN"));
            }
            config.allowed_origin = origin.to_string();
        }

        if let Some(raw) = lookup("GATEHOUSE_COOKIE_SECURE") {
            config.cookie_secure = parse_bool(&raw, "GATEHOUSE_COOKIE_SECURE")?;
        }

        if let Some(raw) = lookup("GATEHOUSE_REJECT_SHARED_PASSWORDS") {
            config.reject_shared_passwords =
                parse_bool(&raw, "GATEHOUSE_REJECT_SHARED_PASSWORDS")?;
        }

        if let Some(pepper) = lookup("GATEHOUSE_PASSWORD_PEPPER").filter(|v| !v.is_empty()) {
            config.password_pepper = SigningSecret::new(pepper);
        }

        config.database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        Ok(config)
    }
}

fn parse_bool(raw: &str, key: &'static str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(key)),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;

    use gatehouse_auth::StaticSecretProvider;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config =
            AppConfig::from_lookup(lookup_from(&[]), &StaticSecretProvider::new("s")).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.token_ttl, TokenTtl::minutes(60));
        assert_eq!(config.directory_timeout, Duration::from_secs(5));
        assert!(config.reject_shared_passwords);
        assert!(!config.cookie_secure);
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = AppConfig::from_lookup(
            lookup_from(&[
                ("GATEHOUSE_ENV", "production"),
                ("GATEHOUSE_BIND_ADDR", "127.0.0.1:9000"),
                ("GATEHOUSE_TOKEN_TTL_MINUTES", "15"),
                ("GATEHOUSE_DIRECTORY_TIMEOUT_MS", "250"),
                ("GATEHOUSE_ALLOWED_ORIGIN", "https://shop.example"),
                ("GATEHOUSE_COOKIE_SECURE", "true"),
                ("GATEHOUSE_REJECT_SHARED_PASSWORDS", "off"),
                ("DATABASE_URL", "postgres://localhost/gatehouse"),
            ]),
            &StaticSecretProvider::new("s"),
        )
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.token_ttl, TokenTtl::minutes(15));
        assert_eq!(config.directory_timeout, Duration::from_millis(250));
        assert_eq!(config.allowed_origin, "https://shop.example");
        assert!(config.cookie_secure);
        assert!(!config.reject_shared_passwords);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/gatehouse"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let secrets = StaticSecretProvider::new("s");
        for (key, value) in [
            ("GATEHOUSE_ENV", "staging"),
            ("GATEHOUSE_BIND_ADDR", "nowhere"),
            ("GATEHOUSE_TOKEN_TTL_MINUTES", "0"),
            ("GATEHOUSE_TOKEN_TTL_MINUTES", "sixty"),
            ("GATEHOUSE_DIRECTORY_TIMEOUT_MS", "0"),
            ("GATEHOUSE_COOKIE_SECURE", "maybe"),
            ("GATEHOUSE_ALLOWED_ORIGIN", "*"),
        ] {
            let result = AppConfig::from_lookup(lookup_from(&[(key, value)]), &secrets);
            assert!(result.is_err(), "{key}={value} should be rejected");
        }
    }

    #[test]
    fn environment_is_read_once() {
        let reads = Cell::new(0);
        let lookup = |key: &str| {
            if key == "GATEHOUSE_ENV" {
                reads.set(reads.get() + 1);
                return Some("production".to_string());
            }
            None
        };

        let config = AppConfig::from_lookup(lookup, &StaticSecretProvider::new("s")).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(reads.get(), 1);
    }

    #[test]
    fn pepper_defaults_to_signing_secret() {
        let config =
            AppConfig::from_lookup(lookup_from(&[]), &StaticSecretProvider::new("s")).unwrap();
        assert_eq!(config.password_pepper.as_bytes(), b"s");

        let config = AppConfig::from_lookup(
            lookup_from(&[("GATEHOUSE_PASSWORD_PEPPER", "pepper")]),
            &StaticSecretProvider::new("s"),
        )
        .unwrap();
        assert_eq!(config.password_pepper.as_bytes(), b"pepper");
    }

    #[test]
    fn production_without_secret_fails_closed() {
        let provider = EnvSecretProvider::new(JWT_SECRET_VAR, Environment::Production.allows_insecure_secret());
        let err = provider.resolve(None).unwrap_err();
        assert_eq!(
            ConfigError::from(err),
            ConfigError::Secret(SecretError::Missing(JWT_SECRET_VAR.into()))
        );
    }
}
