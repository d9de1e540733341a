//! User accounts, customer profiles and login sessions

use crate::error::{required_text, ValidationError, ValidationResult};
use crate::{CustomerId, SessionToken, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const USERNAME_MAX: usize = 150;
pub const ADDRESS_MAX: usize = 255;

/// A login identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, password_hash: String, is_staff: bool) -> Self {
        Self {
            id: UserId::generate(),
            username,
            password_hash,
            is_staff,
            date_joined: Utc::now(),
        }
    }
}

/// Shopping profile attached one-to-one to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub user_id: UserId,
    pub phone: Option<i64>,
    pub address: Option<String>,
}

impl Customer {
    pub fn for_user(user_id: UserId, phone: Option<i64>, address: Option<String>) -> Self {
        Self {
            id: CustomerId::generate(),
            user_id,
            phone,
            address,
        }
    }
}

/// Check username syntax: letters, digits and `@.+-_`
pub fn validate_username(username: &str) -> ValidationResult<String> {
    let username = required_text("username", username, USERNAME_MAX)?;
    if let Some(bad) = username
        .chars()
        .find(|c| !(c.is_alphanumeric() || "@.+-_".contains(*c)))
    {
        return Err(ValidationError::invalid(
            "username",
            format!("character '{}' is not allowed", bad),
        ));
    }
    Ok(username)
}

pub fn validate_phone(phone: i64) -> ValidationResult<i64> {
    if phone < 0 {
        return Err(ValidationError::invalid("phone", "must be a positive number"));
    }
    Ok(phone)
}

/// Sign-up form
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub phone: i64,
    pub address: String,
}

/// Registration input after validation
#[derive(Debug, Clone)]
pub struct ValidRegistration {
    pub username: String,
    pub password: String,
    pub phone: i64,
    pub address: String,
}

impl RegistrationForm {
    /// Field checks that need no storage; username uniqueness is checked by the caller.
    pub fn validate(self) -> ValidationResult<ValidRegistration> {
        let username = validate_username(&self.username)?;
        if self.password.is_empty() {
            return Err(ValidationError::Required { field: "password" });
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        let phone = validate_phone(self.phone)?;
        let address = required_text("address", &self.address, ADDRESS_MAX)?;

        Ok(ValidRegistration {
            username,
            password: self.password,
            phone,
            address,
        })
    }
}

/// Sign-in form
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::Required { field: "username" });
        }
        if self.password.is_empty() {
            return Err(ValidationError::Required { field: "password" });
        }
        Ok(())
    }
}

/// An authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn start(user_id: UserId, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self {
            token: SessionToken::generate(),
            user_id,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
