use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{HeaderValue, Method, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use gatehouse_auth::{Role, TokenCodec, TokenError};

use super::{Gate, Next};
use crate::app::errors::ApiError;
use crate::context::{AccessDecision, PrincipalContext};
use crate::cookie::SessionCookieManager;

pub struct MethodGate {
    expected: Method,
}

impl MethodGate {
    pub fn new(expected: Method) -> Self {
        Self { expected }
    }
}

#[async_trait]
impl Gate for MethodGate {
    async fn handle(&self, req: Request, next: Next) -> Response {
        if req.method() != self.expected {
            tracing::debug!(expected = %self.expected, got = %req.method(), "method rejected");
            let mut res = ApiError::MethodNotAllowed.into_response();
            if let Ok(allow) = HeaderValue::from_str(self.expected.as_str()) {
                res.headers_mut().insert(header::ALLOW, allow);
            }
            return res;
        }
        next.run(req).await
    }
}

/// Verifies the session cookie and attaches a [`PrincipalContext`].
pub struct AuthGate {
    codec: TokenCodec,
    cookies: SessionCookieManager,
}

impl AuthGate {
    pub fn new(codec: TokenCodec, cookies: SessionCookieManager) -> Self {
        Self { codec, cookies }
    }
}

#[async_trait]
impl Gate for AuthGate {
    async fn handle(&self, mut req: Request, next: Next) -> Response {
        let token = match self.cookies.read(req.headers()) {
            Some(token) if !token.is_empty() => token,
            _ => return ApiError::unauthorized("missing session cookie").into_response(),
        };

        let claims = match self.codec.verify(token, Utc::now()) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => {
                return ApiError::unauthorized("session expired").into_response();
            }
            Err(e) => {
                tracing::warn!(error = %e, "session token rejected");
                return ApiError::unauthorized("invalid session token").into_response();
            }
        };

        req.extensions_mut().insert(PrincipalContext::from(claims));
        next.run(req).await
    }
}

pub struct RoleGate {
    required: Role,
}

impl RoleGate {
    pub fn new(required: Role) -> Self {
        Self { required }
    }
}

#[async_trait]
impl Gate for RoleGate {
    async fn handle(&self, req: Request, next: Next) -> Response {
        let decision = AccessDecision::from_principal(req.extensions().get::<PrincipalContext>());

        if !decision.authenticated {
            return ApiError::unauthorized("authentication required").into_response();
        }
        if !decision.has_role(self.required) {
            tracing::warn!(required = %self.required, role = ?decision.role, "role rejected");
            return ApiError::Forbidden.into_response();
        }
        next.run(req).await
    }
}
