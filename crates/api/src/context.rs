use chrono::{DateTime, Utc};

use gatehouse_auth::{Claims, Role};

/// Principal context for a request (verified identity + role).
///
/// Inserted into request extensions by the auth gate; lives exactly as long
/// as the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    email: String,
    role: Role,
    expires_at: DateTime<Utc>,
}

impl PrincipalContext {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl From<Claims> for PrincipalContext {
    fn from(claims: Claims) -> Self {
        let expires_at = claims.expires_at();
        Self {
            email: claims.email,
            role: claims.role,
            expires_at,
        }
    }
}

/// Per-request access decision derived from the (optional) principal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub authenticated: bool,
    pub role: Option<Role>,
}

impl AccessDecision {
    pub fn from_principal(principal: Option<&PrincipalContext>) -> Self {
        match principal {
            Some(p) => Self {
                authenticated: true,
                role: Some(p.role()),
            },
            None => Self {
                authenticated: false,
                role: None,
            },
        }
    }

    pub fn has_role(&self, required: Role) -> bool {
        self.role == Some(required)
    }
}
