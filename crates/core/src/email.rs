//! Email address value object.

use serde::{Deserialize, Serialize};

use crate::DomainError;

const MAX_LEN: usize = 254;

/// A syntactically valid, normalized (trimmed, lower-cased) email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse and normalize an email address.
    ///
    /// Accepts `local@domain` where neither side is empty, the domain holds at
    /// least one interior dot, and no whitespace appears anywhere.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("email is required"));
        }
        if trimmed.len() > MAX_LEN || trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("invalid email format"));
        }

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(DomainError::validation("invalid email format"));
        };

        let domain_ok = !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains("..");

        if local.is_empty() || !domain_ok {
            return Err(DomainError::validation("invalid email format"));
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}
