//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: credential orchestration over the user directory
//! - `routes/`: HTTP handlers, one file per area
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    http::{HeaderValue, StatusCode},
    response::Response,
};
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use gatehouse_auth::{TokenCodec, UserDirectory};

use crate::authz::AccessControlPolicy;
use crate::config::{AppConfig, ConfigError};
use crate::cookie::SessionCookieManager;
use crate::middleware::{self, GateChain, GateDeps, MakeRequestV7, RequestSpan};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::{CredentialService, DirectoryClient};

/// Shared, read-only per-process state handed to every handler.
pub struct AppState {
    pub credentials: CredentialService,
    pub directory: DirectoryClient,
    pub cookies: SessionCookieManager,
}

impl AppState {
    pub fn new(config: &AppConfig, directory: Arc<dyn UserDirectory>) -> Self {
        let client = DirectoryClient::new(directory, config.directory_timeout);
        let credentials = CredentialService::new(
            client.clone(),
            TokenCodec::new(&config.secret),
            config.token_ttl,
            config.reject_shared_passwords,
        );
        Self {
            credentials,
            directory: client,
            cookies: SessionCookieManager::new(config.cookie_secure),
        }
    }
}

/// Build the full HTTP router with the default access-control policy.
pub fn build_app(config: &AppConfig, directory: Arc<dyn UserDirectory>) -> Result<Router, ConfigError> {
    build_app_with_policy(config, directory, &AccessControlPolicy::default_routes())
}

/// Build the router from an explicit policy: one route per rule, each
/// wrapped in CORS and then the gate chain the rule calls for.
pub fn build_app_with_policy(
    config: &AppConfig,
    directory: Arc<dyn UserDirectory>,
    policy: &AccessControlPolicy,
) -> Result<Router, ConfigError> {
    let allowed_origin = HeaderValue::from_str(&config.allowed_origin)
        .map_err(|_| ConfigError::Invalid("GATEHOUSE_ALLOWED_ORIGIN"))?;

    let deps = GateDeps {
        codec: TokenCodec::new(&config.secret),
        cookies: SessionCookieManager::new(config.cookie_secure),
        allowed_origin,
    };
    let state = Arc::new(AppState::new(config, directory));

    let router = policy.rules().iter().fold(Router::new(), |router, rule| {
        let chain = Arc::new(GateChain::for_rule(rule, &deps));
        tracing::debug!(path = rule.path, method = %rule.method, gates = chain.len(), "route registered");
        router.route(
            rule.path,
            routes::handler(rule.endpoint)
                .layer::<_, std::convert::Infallible>(axum::middleware::from_fn_with_state(chain, middleware::run_chain))
                .layer(deps.cors_for(rule)),
        )
    });

    // Outermost first: id assigned, echoed back, then traced under it.
    let observability = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestV7))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(RequestSpan)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router
        .fallback(not_found)
        .layer(Extension(state))
        .layer(observability))
}

async fn not_found() -> Response {
    errors::json_error(StatusCode::NOT_FOUND, "not found")
}
