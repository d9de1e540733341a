//! Account handlers

use crate::api::rest::auth::CurrentUser;
use crate::api::rest::extract::ApiJson;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use crate::services::Profile;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use storefront_types::{Customer, LoginForm, RegistrationForm, User};

/// Registration response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub customer: Customer,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<RegistrationForm>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let (user, customer) = state.services.accounts.register(form).await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { user, customer })))
}

/// Log in and receive a session token
pub async fn login(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<LoginForm>,
) -> ApiResult<Json<LoginResponse>> {
    let (session, user) = state.services.accounts.login(form).await?;
    Ok(Json(LoginResponse {
        token: session.token.as_str().to_string(),
        expires_at: session.expires_at,
        user,
    }))
}

/// End the current session
pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> ApiResult<StatusCode> {
    state.services.accounts.logout(&current.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The current user's profile and orders
pub async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Profile>> {
    Ok(Json(
        state
            .services
            .accounts
            .profile(current.user, current.customer)
            .await?,
    ))
}
