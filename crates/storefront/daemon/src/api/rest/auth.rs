//! Bearer-token authentication extractors

use super::state::AppState;
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use storefront_types::{Customer, SessionToken, User};

/// Longest header value we bother to parse
const MAX_AUTHORIZATION_LEN: usize = 256;

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<SessionToken> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    if raw.len() > MAX_AUTHORIZATION_LEN {
        return None;
    }
    let (scheme, token) = raw.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(SessionToken::new(token))
}

/// The logged-in user behind the request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub token: SessionToken,
    pub user: User,
    pub customer: Customer,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
        let (user, customer) = state.services.accounts.authenticate(&token).await?;
        Ok(Self {
            token,
            user,
            customer,
        })
    }
}

/// A logged-in staff user
#[derive(Debug, Clone)]
pub struct StaffUser(pub CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        if !current.user.is_staff {
            tracing::warn!(username = %current.user.username, "Staff route refused");
            return Err(ApiError::Forbidden("staff only".to_string()));
        }
        Ok(Self(current))
    }
}
