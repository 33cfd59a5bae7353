use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::guard::{GuardError, require_authenticated, require_teacher_or_admin};
use crate::server::AppState;
use crate::types::User;

/// Extractor that requires any valid authentication
pub struct RequireAuth(pub User);

/// Extractor that requires a teacher or admin account
pub struct RequireTeacherOrAdmin(pub User);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    NotTeacherOrAdmin,
    InternalError,
}

impl From<GuardError> for AuthError {
    fn from(e: GuardError) -> Self {
        match e {
            GuardError::InvalidToken | GuardError::UnknownUser => AuthError::InvalidToken,
            GuardError::TokenExpired => AuthError::TokenExpired,
            GuardError::Forbidden => AuthError::NotTeacherOrAdmin,
            GuardError::InternalError => AuthError::InternalError,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Could not validate credentials"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::NotTeacherOrAdmin => (
                StatusCode::FORBIDDEN,
                "Teacher or admin access required",
            ),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        tracing::debug!("Rejected request: {message}");

        let body = json!({ "detail": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw_token = extract_bearer_token(parts)?;
        let user = require_authenticated(state.store.as_ref(), &state.tokens, raw_token)?;
        Ok(RequireAuth(user))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireTeacherOrAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw_token = extract_bearer_token(parts)?;
        let user = require_teacher_or_admin(state.store.as_ref(), &state.tokens, raw_token)?;
        Ok(RequireTeacherOrAdmin(user))
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
fn extract_bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    let (scheme, token) = header.split_once(' ').ok_or(AuthError::InvalidScheme)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidScheme);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingAuth);
    }

    Ok(token)
}
