//! Structural validation of submitted credentials.
//!
//! Credentials are transient: they are parsed per request, handed to the
//! directory, and dropped. `Debug` never prints a password.

use gatehouse_core::{DomainError, EmailAddress};

use crate::Role;

/// Login credentials that passed shape validation.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub email: EmailAddress,
    pub password: String,
}

impl Credential {
    pub fn parse(email: &str, password: &str) -> Result<Self, DomainError> {
        let email = EmailAddress::parse(email)?;
        if password.is_empty() {
            return Err(DomainError::validation("password is required"));
        }
        Ok(Self {
            email,
            password: password.to_string(),
        })
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A registration request that passed shape validation.
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    pub fullname: String,
    pub email: EmailAddress,
    pub password: String,
    pub role: Role,
}

impl Registration {
    pub fn parse(fullname: &str, email: &str, password: &str, role: &str) -> Result<Self, DomainError> {
        let fullname = fullname.trim();
        if fullname.is_empty() {
            return Err(DomainError::validation("fullname is required"));
        }
        let credential = Credential::parse(email, password)?;
        if role.trim().is_empty() {
            return Err(DomainError::validation("role is required"));
        }
        let role = role
            .parse::<Role>()
            .map_err(|_| DomainError::validation("invalid role"))?;

        Ok(Self {
            fullname: fullname.to_string(),
            email: credential.email,
            password: credential.password,
            role,
        })
    }
}

impl core::fmt::Debug for Registration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registration")
            .field("fullname", &self.fullname)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}
