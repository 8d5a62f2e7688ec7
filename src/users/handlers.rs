use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{is_unique_violation, ApiError};
use crate::mail;
use crate::state::AppState;
use crate::users::{
    dto::{
        AuthResponse, ForgetPasswordRequest, LoginRequest, MessageResponse, PublicUser,
        RegisterRequest, ResetPasswordRequest, UpdatePasswordRequest, UpdateProfileRequest,
        VerifyAccountRequest,
    },
    extractors::{ensure_admin, ensure_not_blocked, ensure_owner, AuthUser},
    jwt::JwtKeys,
    password, tokens,
    repo::{NewUser, ProfileUpdate, User},
};

/// Sent for every forget-password request, hit or miss, so responses cannot
/// be used to probe which emails are registered.
const RESET_CONFIRMATION: &str =
    "if that email is registered, a password reset link has been sent";

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ApiError::Validation("invalid email".into()))
    }
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        Err(ApiError::Validation("password too short".into()))
    } else {
        Ok(())
    }
}

fn lifecycle_ttl(state: &AppState) -> Duration {
    Duration::minutes(state.config.lifecycle_token_ttl_minutes)
}

/// Send failures after the token is already persisted are logged and
/// swallowed: the token stays redeemable until expiry, and the response must
/// not change shape on account of the mail provider.
async fn send_lifecycle_email(state: &AppState, to: &str, subject: &str, body: &str) {
    if let Err(e) = state.mailer.send(to, subject, body).await {
        error!(error = %e, to = %to, "lifecycle email send failed; token outstanding until expiry");
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(ApiError::Validation("first and last name are required".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::DuplicateIdentity);
    }

    let hash = password::hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        NewUser {
            email: &payload.email,
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
            password_hash: &hash,
        },
    )
    .await
    .map_err(|e| {
        // Concurrent registration can slip past the pre-check.
        if is_unique_violation(&e) {
            ApiError::DuplicateIdentity
        } else {
            ApiError::from(e)
        }
    })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    validate_email(&payload.email)?;

    // Unknown email and wrong password take the same exit.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !password::verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, user))]
pub async fn refresh(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<AuthResponse>, ApiError> {
    // The auth gate already proved the session; re-issue without a password
    // check so clients can extend sessions and pick up fresh lifecycle flags.
    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, "session token refreshed");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, user))]
pub async fn request_verification(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_not_blocked(&user)?;
    if user.is_verified {
        return Err(ApiError::Validation("account already verified".into()));
    }

    let issued = tokens::issue(OffsetDateTime::now_utc(), lifecycle_ttl(&state));
    User::set_verification_token(&state.db, user.id, &issued.digest, issued.expires_at).await?;

    let (subject, body) = mail::verification_email(
        &state.config.frontend_base_url,
        &issued.plaintext,
        state.config.lifecycle_token_ttl_minutes,
    );
    send_lifecycle_email(&state, &user.email, &subject, &body).await;

    info!(user_id = %user.id, "verification token issued");
    Ok(Json(MessageResponse {
        message: format!("verification email sent to {}", user.email),
    }))
}

#[instrument(skip(state, payload))]
pub async fn confirm_verification(
    State(state): State<AppState>,
    Json(payload): Json<VerifyAccountRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let digest = tokens::digest(&payload.token);
    let user = User::redeem_verification(&state.db, &digest, OffsetDateTime::now_utc())
        .await?
        .ok_or(ApiError::InvalidOrExpiredToken)?;

    info!(user_id = %user.id, "account verified");
    Ok(Json(MessageResponse {
        message: "account verified".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forget_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    validate_email(&payload.email)?;

    if let Some(user) = User::find_by_email(&state.db, &payload.email).await? {
        let issued = tokens::issue(OffsetDateTime::now_utc(), lifecycle_ttl(&state));
        User::set_reset_token(&state.db, user.id, &issued.digest, issued.expires_at).await?;

        let (subject, body) = mail::reset_email(
            &state.config.frontend_base_url,
            &issued.plaintext,
            state.config.lifecycle_token_ttl_minutes,
        );
        send_lifecycle_email(&state, &user.email, &subject, &body).await;
        info!(user_id = %user.id, "password reset token issued");
    } else {
        info!("password reset requested for unknown email");
    }

    Ok(Json(MessageResponse {
        message: RESET_CONFIRMATION.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_password(&payload.password)?;

    let digest = tokens::digest(&payload.token);
    let user = User::redeem_reset(&state.db, &digest, OffsetDateTime::now_utc())
        .await?
        .ok_or(ApiError::InvalidOrExpiredToken)?;

    let hash = password::hash_password(&payload.password)?;
    User::update_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password reset completed");
    Ok(Json(MessageResponse {
        message: "password updated, login with your new password".into(),
    }))
}

#[instrument(skip(user))]
pub async fn me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip(state, user, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AuthUser(user): AuthUser,
    Json(mut payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    ensure_owner(&user, id)?;
    ensure_not_blocked(&user)?;

    if let Some(email) = payload.email.as_mut() {
        *email = email.trim().to_lowercase();
        validate_email(email)?;
    }

    let updated = User::update_profile(
        &state.db,
        user.id,
        ProfileUpdate {
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            bio: payload.bio,
            profile_photo: payload.profile_photo,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::DuplicateIdentity
        } else {
            ApiError::from(e)
        }
    })?
    .ok_or(ApiError::Unauthenticated("account no longer exists"))?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(updated.into()))
}

#[instrument(skip(state, user, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AuthUser(user): AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_owner(&user, id)?;
    ensure_not_blocked(&user)?;
    validate_password(&payload.password)?;

    let hash = password::hash_password(&payload.password)?;
    User::update_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok(Json(MessageResponse {
        message: "password updated".into(),
    }))
}

#[instrument(skip(state, admin))]
pub async fn block_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AuthUser(admin): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    ensure_admin(&admin)?;
    let user = User::set_blocked(&state.db, id, true)
        .await?
        .ok_or_else(|| ApiError::Validation("user not found".into()))?;

    info!(admin_id = %admin.id, user_id = %user.id, "user blocked");
    Ok(Json(user.into()))
}

#[instrument(skip(state, admin))]
pub async fn unblock_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AuthUser(admin): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    ensure_admin(&admin)?;
    let user = User::set_blocked(&state.db, id, false)
        .await?
        .ok_or_else(|| ApiError::Validation("user not found".into()))?;

    info!(admin_id = %admin.id, user_id = %user.id, "user unblocked");
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("spaces in@x.com"));
    }

    #[test]
    fn password_length_floor() {
        assert!(validate_password("12345678").is_ok());
        assert!(matches!(
            validate_password("1234567").unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn reset_confirmation_does_not_mention_existence() {
        assert!(RESET_CONFIRMATION.starts_with("if that email is registered"));
    }
}
