//! Gate chain: an ordered list of request preconditions in front of a handler.
//!
//! Each [`Gate`] either forwards the request through [`Next`] or answers it
//! itself. The chain for a route is fixed by its [`RouteRule`]: method, then
//! auth and role when the rule asks for them. CORS sits outside the chain as
//! a tower-http layer (see [`http`]).

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::response::Response;

use gatehouse_auth::TokenCodec;

use crate::authz::{Access, RouteRule};
use crate::cookie::SessionCookieManager;

pub mod gates;
pub mod http;

pub use gates::{AuthGate, MethodGate, RoleGate};
pub use http::{MakeRequestV7, REQUEST_ID_HEADER, RequestSpan, cors_layer};

#[async_trait]
pub trait Gate: Send + Sync {
    async fn handle(&self, req: Request, next: Next) -> Response;
}

/// The rest of the chain, ending in the route handler.
pub struct Next {
    gates: Arc<[Arc<dyn Gate>]>,
    index: usize,
    endpoint: axum::middleware::Next,
}

impl Next {
    pub async fn run(self, req: Request) -> Response {
        match self.gates.get(self.index).cloned() {
            Some(gate) => {
                let rest = Next {
                    index: self.index + 1,
                    ..self
                };
                gate.handle(req, rest).await
            }
            None => self.endpoint.run(req).await,
        }
    }
}

/// What the gates need from the application.
#[derive(Clone)]
pub struct GateDeps {
    pub codec: TokenCodec,
    pub cookies: SessionCookieManager,
    pub allowed_origin: HeaderValue,
}

impl GateDeps {
    /// CORS layer for the route a rule describes.
    pub fn cors_for(&self, rule: &RouteRule) -> tower_http::cors::CorsLayer {
        cors_layer(&self.allowed_origin, &rule.method)
    }
}

#[derive(Clone, Default)]
pub struct GateChain {
    gates: Arc<[Arc<dyn Gate>]>,
}

impl GateChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, gate: impl Gate + 'static) -> Self {
        let mut gates = self.gates.to_vec();
        gates.push(Arc::new(gate));
        Self {
            gates: gates.into(),
        }
    }

    /// Build the chain a policy rule calls for.
    pub fn for_rule(rule: &RouteRule, deps: &GateDeps) -> Self {
        let chain = Self::new().with(MethodGate::new(rule.method.clone()));

        match rule.access {
            Access::Public => chain,
            Access::Authenticated => chain.with(AuthGate::new(deps.codec.clone(), deps.cookies)),
            Access::Role(role) => chain
                .with(AuthGate::new(deps.codec.clone(), deps.cookies))
                .with(RoleGate::new(role)),
        }
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub async fn run(&self, req: Request, endpoint: axum::middleware::Next) -> Response {
        Next {
            gates: Arc::clone(&self.gates),
            index: 0,
            endpoint,
        }
        .run(req)
        .await
    }
}

/// `from_fn_with_state` entry point.
pub async fn run_chain(
    State(chain): State<Arc<GateChain>>,
    req: Request,
    endpoint: axum::middleware::Next,
) -> Response {
    let res = chain.run(req, endpoint).await;
    tracing::debug!(status = res.status().as_u16(), gates = chain.len(), "gate chain finished");
    res
}
