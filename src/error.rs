use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Closed set of failures the API can report. Handlers return these instead
/// of ad-hoc status/message tuples so callers branch on kind, not on text.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("email already registered")]
    DuplicateIdentity,

    /// Uniform for "no such email" and "wrong password" so login failures
    /// cannot be used to enumerate accounts.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("you are not allowed to perform this action")]
    Forbidden,

    /// Lifecycle tokens: "no matching token" and "token expired" are
    /// deliberately indistinguishable to the caller.
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("upstream dependency unavailable")]
    Dependency(anyhow::Error),

    #[error("internal error")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Store connectivity problems surface as dependency failures the
        // transport layer may retry; everything else stays opaque.
        let unreachable = err
            .downcast_ref::<sqlx::Error>()
            .map(|e| {
                matches!(
                    e,
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
                )
            })
            .unwrap_or(false);
        if unreachable {
            ApiError::Dependency(err)
        } else {
            ApiError::Internal(err)
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateIdentity => StatusCode::CONFLICT,
            ApiError::InvalidCredentials
            | ApiError::Unauthenticated(_)
            | ApiError::InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Dependency(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details go to the log, never to the client.
        match &self {
            ApiError::Internal(e) => error!(error = %e, "internal error"),
            ApiError::Dependency(e) => error!(error = %e, "dependency failure"),
            _ => {}
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// True when the error wraps a Postgres unique-constraint violation, which
/// is how a concurrent duplicate registration surfaces past the pre-check.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::DuplicateIdentity.status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Unauthenticated("missing authorization header").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::InvalidOrExpiredToken.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Dependency(anyhow::anyhow!("smtp down")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_connectivity_maps_to_dependency() {
        let err: ApiError = anyhow::Error::from(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, ApiError::Dependency(_)));

        let err: ApiError = anyhow::anyhow!("some other failure").into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn internal_message_is_opaque() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused to 10.0.0.3"));
        assert_eq!(err.to_string(), "internal error");
    }

    #[test]
    fn credential_failures_share_one_shape() {
        // Unknown email and wrong password must be indistinguishable.
        let a = ApiError::InvalidCredentials;
        let b = ApiError::InvalidCredentials;
        assert_eq!(a.status(), b.status());
        assert_eq!(a.to_string(), b.to_string());
    }
}
