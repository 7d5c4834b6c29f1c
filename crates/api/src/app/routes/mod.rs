use axum::routing::{MethodRouter, any};

use crate::authz::Endpoint;

pub mod admin;
pub mod system;
pub mod user;

/// Handler for a policy endpoint. Method filtering is left to the gate
/// chain, so every handler accepts any method here.
pub fn handler(endpoint: Endpoint) -> MethodRouter {
    match endpoint {
        Endpoint::Health => any(system::health),
        Endpoint::Login => any(user::login),
        Endpoint::Logout => any(user::logout),
        Endpoint::Register => any(user::register),
        Endpoint::ListUsers => any(admin::list_users),
    }
}
