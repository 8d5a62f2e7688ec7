use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::{CurrentUser, User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for account verification (token from the emailed link).
#[derive(Debug, Deserialize)]
pub struct VerifyAccountRequest {
    pub token: String,
}

/// Request body for starting a password reset.
#[derive(Debug, Deserialize)]
pub struct ForgetPasswordRequest {
    pub email: String,
}

/// Request body for completing a password reset.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Request body for profile updates; absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_photo: Option<String>,
}

/// Request body for changing the own password.
#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub profile_photo: String,
    pub is_admin: bool,
    pub is_blocked: bool,
    pub is_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            profile_photo: user.profile_photo,
            is_admin: user.is_admin,
            is_blocked: user.is_blocked,
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

impl From<CurrentUser> for PublicUser {
    fn from(user: CurrentUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            profile_photo: user.profile_photo,
            is_admin: user.is_admin,
            is_blocked: user.is_blocked,
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

/// Response returned after login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Generic confirmation body for lifecycle operations.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_serializes_expected_fields() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            email: "test@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            bio: Some("writes".into()),
            profile_photo: "https://example.com/p.png".into(),
            is_admin: false,
            is_blocked: false,
            is_verified: true,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("is_verified"));
        assert!(!json.contains("password"));
        assert!(!json.contains("token_hash"));
    }
}
