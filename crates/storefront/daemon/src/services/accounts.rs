//! Account service: registration, login and bearer sessions

use super::{ServiceError, ServiceResult};
use crate::config::AccountsConfig;
use crate::error::StorageError;
use crate::storage::Storage;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use storefront_types::password::{hash_password, verify_password};
use storefront_types::{
    Customer, LoginForm, Order, RegistrationForm, Session, SessionToken, User, ValidationError,
};

/// A user's own account page
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: User,
    pub customer: Customer,
    pub orders: Vec<Order>,
}

/// Account operations
pub struct AccountService {
    storage: Arc<dyn Storage>,
    config: AccountsConfig,
}

impl AccountService {
    pub fn new(storage: Arc<dyn Storage>, config: AccountsConfig) -> Self {
        Self { storage, config }
    }

    /// Register a user together with its customer profile
    pub async fn register(&self, form: RegistrationForm) -> ServiceResult<(User, Customer)> {
        let valid = form.validate()?;
        if self
            .storage
            .get_user_by_username(&valid.username)
            .await?
            .is_some()
        {
            return Err(ValidationError::UsernameTaken.into());
        }

        let is_staff = self.config.is_staff_username(&valid.username);
        let iterations = self.config.password_iterations;
        let password = valid.password;
        let password_hash =
            tokio::task::spawn_blocking(move || hash_password(&password, iterations))
                .await
                .map_err(|e| ServiceError::Internal(format!("password hashing task failed: {}", e)))?
                .map_err(|e| ServiceError::Internal(format!("password hashing failed: {}", e)))?;
        let user = User::new(valid.username, password_hash, is_staff);
        let customer = Customer::for_user(user.id, Some(valid.phone), Some(valid.address));

        match self
            .storage
            .create_account(user.clone(), customer.clone())
            .await
        {
            Ok(()) => {}
            // lost a race with a concurrent registration
            Err(StorageError::Conflict(_)) => return Err(ValidationError::UsernameTaken.into()),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %user.id, username = %user.username, is_staff, "Registered user");
        Ok((user, customer))
    }

    /// Check credentials and start a session
    pub async fn login(&self, form: LoginForm) -> ServiceResult<(Session, User)> {
        form.validate()?;
        let username = form.username.trim();
        let user = self
            .storage
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| ValidationError::UnknownUser(username.to_string()))?;

        let password = form.password;
        let encoded = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &encoded))
            .await
            .map_err(|e| ServiceError::Internal(format!("password check task failed: {}", e)))?;
        if !verified {
            tracing::warn!(username = %user.username, "Login with wrong password");
            return Err(ValidationError::WrongPassword.into());
        }

        let ttl = self.config.session_ttl().ok_or_else(|| {
            ServiceError::Internal(format!(
                "session ttl of {} hours is out of range",
                self.config.session_ttl_hours
            ))
        })?;
        let session = Session::start(user.id, ttl);
        self.storage.create_session(session.clone()).await?;

        tracing::info!(user_id = %user.id, expires_at = %session.expires_at, "User logged in");
        Ok((session, user))
    }

    /// End a session
    pub async fn logout(&self, token: &SessionToken) -> ServiceResult<()> {
        if self.storage.delete_session(token).await? {
            tracing::info!("User logged out");
        }
        Ok(())
    }

    /// Resolve a bearer token to its user and customer.
    /// Expired sessions are removed on sight.
    pub async fn authenticate(&self, token: &SessionToken) -> ServiceResult<(User, Customer)> {
        let session = self
            .storage
            .get_session(token)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("invalid session token".to_string()))?;

        if session.is_expired_at(Utc::now()) {
            self.storage.delete_session(token).await?;
            return Err(ServiceError::Unauthorized("session expired".to_string()));
        }

        let user = self
            .storage
            .get_user(&session.user_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("invalid session token".to_string()))?;
        let customer = self
            .storage
            .get_customer_for_user(&user.id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("customer for {}", user.id)))?;

        Ok((user, customer))
    }

    /// The user's details with their orders, newest first
    pub async fn profile(&self, user: User, customer: Customer) -> ServiceResult<Profile> {
        let orders = self.storage.list_orders_for_customer(&customer.id).await?;
        Ok(Profile {
            user,
            customer,
            orders,
        })
    }

    /// Drop every expired session
    pub async fn purge_expired_sessions(&self) -> ServiceResult<usize> {
        let purged = self.storage.purge_expired_sessions(Utc::now()).await?;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired sessions");
        }
        Ok(purged)
    }
}
