// src/models/user.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Letters, digits and `@ . + - _`.
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"));

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'user' or 'admin'.
    pub role: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Aggregated user profile data for the current user.
#[derive(Debug, Serialize, FromRow)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub patterns_count: i64,
    pub saved_patterns_count: i64,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateUserRequest {
    #[validate(
        length(
            min = 3,
            max = 150,
            message = "Username length must be between 3 and 150 characters."
        ),
        custom(function = validate_username)
    )]
    pub username: String,

    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords don't match"))]
    pub verify_password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

fn validate_username(username: &str) -> Result<(), validator::ValidationError> {
    if !USERNAME_RE.is_match(username) {
        return Err(validator::ValidationError::new("invalid_username"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, password: &str, verify: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            email: "maker@loop.io".to_string(),
            password: password.to_string(),
            verify_password: verify.to_string(),
        }
    }

    #[test]
    fn matching_passwords_validate() {
        assert!(request("yarn_lover", "secret1", "secret1").validate().is_ok());
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let errors = request("yarn_lover", "secret1", "secret2").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("verify_password"));
    }

    #[test]
    fn username_with_spaces_is_rejected() {
        let errors = request("yarn lover", "secret1", "secret1").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));
    }
}
