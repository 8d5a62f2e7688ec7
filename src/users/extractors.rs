use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::users::jwt::{JwtKeys, SessionTokenError};
use crate::users::repo::CurrentUser;

/// Authenticated identity for a request: bearer token verified, user record
/// resolved from the store (minus the password hash) and attached here.
pub struct AuthUser(pub CurrentUser);

fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::Unauthenticated("missing authorization header"))?;

        let token =
            bearer_token(header).ok_or(ApiError::Unauthenticated("invalid auth scheme"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!("session token rejected");
            match e {
                SessionTokenError::Expired => {
                    ApiError::Unauthenticated("session token expired, login again")
                }
                SessionTokenError::Invalid => ApiError::Unauthenticated("invalid session token"),
            }
        })?;

        let user = CurrentUser::find(&state.db, claims.sub)
            .await?
            .ok_or(ApiError::Unauthenticated("account no longer exists"))?;

        Ok(AuthUser(user))
    }
}

/// Path-identified resources may only be mutated by their owner.
pub fn ensure_owner(user: &CurrentUser, path_id: Uuid) -> Result<(), ApiError> {
    if user.id == path_id {
        Ok(())
    } else {
        warn!(user_id = %user.id, path_id = %path_id, "ownership mismatch");
        Err(ApiError::Forbidden)
    }
}

pub fn ensure_admin(user: &CurrentUser) -> Result<(), ApiError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Blocked accounts keep read access but are rejected on mutating actions.
pub fn ensure_not_blocked(user: &CurrentUser) -> Result<(), ApiError> {
    if user.is_blocked {
        Err(ApiError::Forbidden)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn current_user() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            bio: None,
            profile_photo: "https://example.com/stock.png".into(),
            is_admin: false,
            is_blocked: false,
            is_verified: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn bearer_token_parses_both_prefixes() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("Basic dXNlcg=="), None);
        assert_eq!(bearer_token("abc.def.ghi"), None);
    }

    #[test]
    fn owner_check_passes_for_self() {
        let user = current_user();
        assert!(ensure_owner(&user, user.id).is_ok());
    }

    #[test]
    fn owner_check_forbids_other_identity() {
        let user = current_user();
        let err = ensure_owner(&user, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[test]
    fn admin_check() {
        let mut user = current_user();
        assert!(matches!(
            ensure_admin(&user).unwrap_err(),
            ApiError::Forbidden
        ));
        user.is_admin = true;
        assert!(ensure_admin(&user).is_ok());
    }

    #[test]
    fn blocked_accounts_cannot_mutate() {
        let mut user = current_user();
        assert!(ensure_not_blocked(&user).is_ok());
        user.is_blocked = true;
        assert!(matches!(
            ensure_not_blocked(&user).unwrap_err(),
            ApiError::Forbidden
        ));
    }
}
