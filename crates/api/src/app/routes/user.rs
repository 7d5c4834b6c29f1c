use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::app::AppState;
use crate::app::dto::{LoginRequest, RegisterRequest, SessionResponse};
use crate::app::errors::ApiError;
use crate::app::services::IssuedSession;

pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let session = state.credentials.login(&req.email, &req.password).await?;
    session_response(&state, StatusCode::OK, session)
}

pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let session = state
        .credentials
        .register(&req.fullname, &req.email, &req.password, &req.role)
        .await?;
    session_response(&state, StatusCode::CREATED, session)
}

pub async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    state.credentials.logout(state.cookies.read(&headers))?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, state.cookies.clear())],
        "logged out",
    )
        .into_response())
}

fn session_response(
    state: &AppState,
    status: StatusCode,
    session: IssuedSession,
) -> Result<Response, ApiError> {
    let cookie = state
        .cookies
        .issue(&session.token, session.expires_at(), Utc::now())
        .map_err(|e| ApiError::internal(format!("session cookie: {e}")))?;

    let body = SessionResponse {
        email: session.email,
        token: session.token,
    };
    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}
