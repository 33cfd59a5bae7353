use super::token::{TokenRejection, TokenService};
use crate::store::Store;
use crate::types::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardError {
    /// Token malformed or badly signed.
    InvalidToken,
    TokenExpired,
    /// Token was valid but names an account that no longer exists.
    UnknownUser,
    /// Authenticated, but the role is not allowed.
    Forbidden,
    InternalError,
}

/// Resolves a bearer token to the account it was issued for.
pub fn require_authenticated(
    store: &dyn Store,
    tokens: &TokenService,
    raw_token: &str,
) -> Result<User, GuardError> {
    let username = tokens.verify(raw_token).map_err(|e| match e {
        TokenRejection::Expired => GuardError::TokenExpired,
        TokenRejection::Malformed | TokenRejection::BadSignature => GuardError::InvalidToken,
    })?;

    store
        .get_user_by_username(&username)
        .map_err(|e| {
            tracing::error!("Failed to load user for token: {e}");
            GuardError::InternalError
        })?
        .ok_or(GuardError::UnknownUser)
}

/// As [`require_authenticated`], then rejects accounts that may not modify records.
pub fn require_teacher_or_admin(
    store: &dyn Store,
    tokens: &TokenService,
    raw_token: &str,
) -> Result<User, GuardError> {
    let user = require_authenticated(store, tokens, raw_token)?;

    if !user.role.can_manage_records() {
        return Err(GuardError::Forbidden);
    }

    Ok(user)
}
