use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    response::IntoResponse,
};

use crate::auth::{RequireAuth, UNKNOWN_USER_DIGEST};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{LoginForm, RegisterRequest, TokenResponse, UserResponse};
use crate::server::response::{ApiError, StoreResultExt};
use crate::server::validation::{validate_password, validate_username};

const BAD_CREDENTIALS: &str = "Incorrect username or password";

/// Runs Argon2 on the blocking pool.
async fn hash_password(state: &Arc<AppState>, password: String) -> Result<String, ApiError> {
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || state.hasher.hash(&password))
        .await
        .map_err(|e| {
            tracing::error!("Password hashing task failed: {e}");
            ApiError::internal("Failed to hash password")
        })?
        .api_err("Failed to hash password")
}

async fn verify_password(state: &Arc<AppState>, password: String, digest: String) -> bool {
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || state.hasher.verify(&password, &digest))
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Password verification task failed: {e}");
            false
        })
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    validate_username(&req.username)?;
    validate_password(&req.password)?;

    let password_hash = hash_password(&state, req.password).await?;

    let user = match state.store.create_user(&req.username, &password_hash, req.role) {
        Ok(user) => user,
        Err(Error::Conflict(_)) => {
            return Err(ApiError::conflict("Username already registered"));
        }
        Err(e) => {
            tracing::error!("Failed to create user: {e}");
            return Err(ApiError::internal("Failed to create user"));
        }
    };

    tracing::info!(user_id = user.id, role = %user.role, "Registered user {}", user.username);

    Ok::<_, ApiError>(Json(UserResponse::from(user)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user_by_username(&form.username)
        .api_err("Failed to look up user")?;

    // Unknown usernames still pay for a full Argon2 check
    let digest = user
        .as_ref()
        .map_or(UNKNOWN_USER_DIGEST, |user| user.password_hash.as_str())
        .to_string();
    let verified = verify_password(&state, form.password, digest).await;

    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::debug!("Failed login for {}", form.username);
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        }
    };

    let token = state
        .tokens
        .issue(&user.username)
        .api_err("Failed to issue token")?;

    Ok::<_, ApiError>(Json(TokenResponse::bearer(token)))
}

pub async fn me(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    Json(UserResponse::from(user))
}
