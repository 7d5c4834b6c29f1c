//! Declarative access-control policy.
//!
//! Every routed path has exactly one rule. Adding a protected route means
//! adding a row here; the gate chain is derived from it.

use axum::http::Method;

use gatehouse_auth::Role;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Role(Role),
}

/// Handler a rule dispatches to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Health,
    Login,
    Logout,
    Register,
    ListUsers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub path: &'static str,
    pub method: Method,
    pub access: Access,
    pub endpoint: Endpoint,
}

impl RouteRule {
    pub fn new(path: &'static str, method: Method, access: Access, endpoint: Endpoint) -> Self {
        Self {
            path,
            method,
            access,
            endpoint,
        }
    }

    pub fn auth_required(&self) -> bool {
        !matches!(self.access, Access::Public)
    }

    pub fn required_role(&self) -> Option<Role> {
        match self.access {
            Access::Role(role) => Some(role),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessControlPolicy {
    rules: Vec<RouteRule>,
}

impl AccessControlPolicy {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    pub fn default_routes() -> Self {
        Self::new(vec![
            RouteRule::new("/health", Method::GET, Access::Public, Endpoint::Health),
            RouteRule::new("/api/user/login", Method::POST, Access::Public, Endpoint::Login),
            RouteRule::new("/api/user/logout", Method::POST, Access::Public, Endpoint::Logout),
            RouteRule::new("/api/user/register", Method::POST, Access::Public, Endpoint::Register),
            RouteRule::new(
                "/api/admin/users",
                Method::GET,
                Access::Role(Role::Admin),
                Endpoint::ListUsers,
            ),
        ])
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn rule_for(&self, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|r| r.path == path)
    }
}

impl Default for AccessControlPolicy {
    fn default() -> Self {
        Self::default_routes()
    }
}
