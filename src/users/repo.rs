use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, bio, profile_photo, \
     is_admin, is_blocked, is_verified, verification_token_hash, verification_expires_at, \
     reset_token_hash, reset_expires_at, created_at, updated_at";

/// User record in the database. Credential and token digests never leave
/// the process in serialized form.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub profile_photo: String,
    pub is_admin: bool,
    pub is_blocked: bool,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token_hash: Option<String>,
    pub verification_expires_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,
    pub reset_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Projection the auth gate resolves and attaches to the request context.
/// The password hash column is excluded at the query level.
#[derive(Debug, Clone, FromRow)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub profile_photo: String,
    pub is_admin: bool,
    pub is_blocked: bool,
    pub is_verified: bool,
    pub created_at: OffsetDateTime,
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
}

pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_photo: Option<String>,
}

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with a pre-hashed password.
    pub async fn create(db: &PgPool, new: NewUser<'_>) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, first_name, last_name, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new.email)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Stores a fresh verification-token digest, superseding any outstanding
    /// one. Only the latest digest is redeemable.
    pub async fn set_verification_token(
        db: &PgPool,
        id: Uuid,
        digest: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users
             SET verification_token_hash = $2, verification_expires_at = $3, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(digest)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Stores a fresh password-reset-token digest, superseding any
    /// outstanding one.
    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        digest: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users
             SET reset_token_hash = $2, reset_expires_at = $3, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(digest)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Redeems a verification token: one statement matches the digest with a
    /// strictly-future expiry, flips the verified flag and clears the token.
    /// Returns None for both a wrong and an expired token.
    pub async fn redeem_verification(
        db: &PgPool,
        digest: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET is_verified = TRUE,
                 verification_token_hash = NULL,
                 verification_expires_at = NULL,
                 updated_at = now()
             WHERE verification_token_hash = $1 AND verification_expires_at > $2
             RETURNING {USER_COLUMNS}"
        ))
        .bind(digest)
        .bind(now)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Redeems a password-reset token; same single-statement contract as
    /// verification redemption.
    pub async fn redeem_reset(
        db: &PgPool,
        digest: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET reset_token_hash = NULL,
                 reset_expires_at = NULL,
                 updated_at = now()
             WHERE reset_token_hash = $1 AND reset_expires_at > $2
             RETURNING {USER_COLUMNS}"
        ))
        .bind(digest)
        .bind(now)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Replaces the stored hash and clears any outstanding reset token so a
    /// previously emailed token can no longer change the new password.
    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users
             SET password_hash = $2,
                 reset_token_hash = NULL,
                 reset_expires_at = NULL,
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Partial profile update; absent fields keep their stored value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET email = COALESCE($2, email),
                 first_name = COALESCE($3, first_name),
                 last_name = COALESCE($4, last_name),
                 bio = COALESCE($5, bio),
                 profile_photo = COALESCE($6, profile_photo),
                 updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.email)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.bio)
        .bind(update.profile_photo)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Admin moderation switch consumed by the mutating-action guards.
    pub async fn set_blocked(
        db: &PgPool,
        id: Uuid,
        blocked: bool,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_blocked = $2, updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(blocked)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}

impl CurrentUser {
    /// Lookup used by the auth gate, one per authenticated request.
    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<CurrentUser>> {
        let user = sqlx::query_as::<_, CurrentUser>(
            "SELECT id, email, first_name, last_name, bio, profile_photo,
                    is_admin, is_blocked, is_verified, created_at
             FROM users
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$secret".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            bio: None,
            profile_photo: "https://example.com/stock.png".into(),
            is_admin: false,
            is_blocked: false,
            is_verified: false,
            verification_token_hash: Some("digest".into()),
            verification_expires_at: Some(now),
            reset_token_hash: Some("digest".into()),
            reset_expires_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn serialized_user_never_leaks_secrets() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("verification_token_hash"));
        assert!(!json.contains("reset_token_hash"));
        assert!(json.contains("a@x.com"));
    }
}
