//! Session authentication - sign-up, sign-in, sign-out and password flows.
//!
//! Accounts live in `users` (email + argon2 hash) with a matching `profiles`
//! row carrying the role. Sessions are opaque v4 UUID tokens stored in
//! `sessions`; password reset tokens live in `password_resets` for one hour.

use crate::{
    config::users::AdminBootstrap,
    entities::{PasswordReset, Profile, Role, Session, User, password_reset, profile, session, user},
    errors::{Error, Result},
};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shortest password accepted on sign-up and password change
pub const MIN_PASSWORD_LEN: usize = 6;

const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// A signed-in session as seen by callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token identifying the session
    pub token: String,
    pub user_id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_ascii_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::validation(format!("invalid email '{email}'")));
    }
    Ok(email)
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

async fn find_user_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn open_session(db: &DatabaseConnection, user: &user::Model) -> Result<AuthSession> {
    let session = session::ActiveModel {
        token: Set(Uuid::new_v4().simple().to_string()),
        user_id: Set(user.id),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?;

    Ok(AuthSession {
        token: session.token,
        user_id: user.id,
        email: user.email.clone(),
        created_at: session.created_at,
    })
}

/// Creates a user and its profile with the given role, without opening a session.
///
/// # Errors
/// - [`Error::Validation`] for a malformed email or a short password
/// - [`Error::EmailTaken`] if the email is already registered
pub async fn create_account(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    role: Role,
) -> Result<profile::Model> {
    let email = normalize_email(email)?;
    validate_password(password)?;

    if find_user_by_email(db, &email).await?.is_some() {
        return Err(Error::EmailTaken { email });
    }

    let password_hash = hash_password(password)?;
    let now = Utc::now();

    let txn = db.begin().await?;
    let user = user::ActiveModel {
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let profile = profile::ActiveModel {
        id: Set(user.id),
        email: Set(email),
        role: Set(role),
        created_at: Set(now),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!(user_id = user.id, role = %role, "Registered new account");
    Ok(profile)
}

/// Registers a new seller account and signs it in.
pub async fn sign_up(db: &DatabaseConnection, email: &str, password: &str) -> Result<AuthSession> {
    let profile = create_account(db, email, password, Role::Seller).await?;
    let user = User::find_by_id(profile.id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", profile.id))?;
    open_session(db, &user).await
}

/// Verifies credentials and opens a new session.
///
/// # Errors
/// Returns [`Error::InvalidCredentials`] for an unknown email or a wrong password alike.
pub async fn sign_in(db: &DatabaseConnection, email: &str, password: &str) -> Result<AuthSession> {
    let email = normalize_email(email).map_err(|_| Error::InvalidCredentials)?;

    let Some(user) = find_user_by_email(db, &email).await? else {
        tracing::warn!("Sign-in attempt for unknown email");
        return Err(Error::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash) {
        tracing::warn!(user_id = user.id, "Sign-in with wrong password");
        return Err(Error::InvalidCredentials);
    }

    open_session(db, &user).await
}

/// Ends a session. Unknown tokens are ignored.
pub async fn sign_out(db: &DatabaseConnection, token: &str) -> Result<()> {
    let result = Session::delete_by_id(token.to_string()).exec(db).await?;
    tracing::debug!(rows = result.rows_affected, "Signed out");
    Ok(())
}

/// Resolves a token into its session, or `None` if it was never issued or has been revoked.
pub async fn get_session(db: &DatabaseConnection, token: &str) -> Result<Option<AuthSession>> {
    let found = Session::find_by_id(token.to_string())
        .find_also_related(User)
        .one(db)
        .await?;

    Ok(match found {
        Some((session, Some(user))) => Some(AuthSession {
            token: session.token,
            user_id: user.id,
            email: user.email,
            created_at: session.created_at,
        }),
        _ => None,
    })
}

/// Issues a one-hour password reset token.
///
/// Returns `None` without error for unknown emails; the result does not reveal
/// which addresses are registered. Delivering the token is left to the caller.
pub async fn request_password_reset(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<String>> {
    let Ok(email) = normalize_email(email) else {
        return Ok(None);
    };
    let Some(user) = find_user_by_email(db, &email).await? else {
        return Ok(None);
    };

    let reset = password_reset::ActiveModel {
        token: Set(Uuid::new_v4().simple().to_string()),
        user_id: Set(user.id),
        expires_at: Set(Utc::now() + chrono::Duration::minutes(RESET_TOKEN_TTL_MINUTES)),
    }
    .insert(db)
    .await?;

    tracing::debug!(user_id = user.id, "Issued password reset token");
    Ok(Some(reset.token))
}

async fn store_password_hash<C>(db: &C, user_id: i64, password: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut user: user::ActiveModel = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))?
        .into();
    user.password_hash = Set(hash_password(password)?);
    user.update(db).await?;
    Ok(())
}

/// Sets a new password using a reset token. The token is consumed and every
/// open session of the user is revoked.
///
/// # Errors
/// Returns [`Error::InvalidToken`] when the token is unknown or expired.
pub async fn reset_password(db: &DatabaseConnection, token: &str, new_password: &str) -> Result<()> {
    validate_password(new_password)?;

    let reset = PasswordReset::find_by_id(token.to_string())
        .one(db)
        .await?
        .ok_or(Error::InvalidToken)?;

    if reset.expires_at <= Utc::now() {
        reset.delete(db).await?;
        return Err(Error::InvalidToken);
    }

    let user_id = reset.user_id;
    let txn = db.begin().await?;
    store_password_hash(&txn, user_id, new_password).await?;
    reset.delete(&txn).await?;
    Session::delete_many()
        .filter(session::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    tracing::info!(user_id, "Password reset completed");
    Ok(())
}

/// Changes the password of the signed-in user.
pub async fn update_password(
    db: &DatabaseConnection,
    session_token: &str,
    new_password: &str,
) -> Result<()> {
    validate_password(new_password)?;
    let session = get_session(db, session_token)
        .await?
        .ok_or(Error::NotAuthenticated)?;
    store_password_hash(db, session.user_id, new_password).await?;
    tracing::info!(user_id = session.user_id, "Password updated");
    Ok(())
}

/// Ensures the configured bootstrap account exists and is an admin.
pub async fn bootstrap_admin(
    db: &DatabaseConnection,
    admin: &AdminBootstrap,
) -> Result<profile::Model> {
    let email = normalize_email(&admin.email)?;
    let Some(user) = find_user_by_email(db, &email).await? else {
        return create_account(db, &email, &admin.password, Role::Admin).await;
    };

    match Profile::find_by_id(user.id).one(db).await? {
        Some(existing) if existing.role == Role::Admin => Ok(existing),
        Some(existing) => {
            let mut profile: profile::ActiveModel = existing.into();
            profile.role = Set(Role::Admin);
            let promoted = profile.update(db).await?;
            tracing::info!(user_id = user.id, "Promoted bootstrap account to admin");
            Ok(promoted)
        }
        None => profile::ActiveModel {
            id: Set(user.id),
            email: Set(email),
            role: Set(Role::Admin),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .map_err(Into::into),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_sign_up_and_sign_in() -> Result<()> {
        let db = setup_test_db().await?;

        let session = sign_up(&db, "  Ana@Shop.test ", "secret1").await?;
        assert_eq!(session.email, "ana@shop.test");

        let profile = crate::core::profile::get_profile(&db, session.user_id)
            .await?
            .unwrap();
        assert_eq!(profile.role, Role::Seller);

        let again = sign_in(&db, "ANA@shop.test", "secret1").await?;
        assert_eq!(again.user_id, session.user_id);
        assert_ne!(again.token, session.token);
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_up_rejects_duplicates_and_short_passwords() -> Result<()> {
        let db = setup_test_db().await?;
        sign_up(&db, "ana@shop.test", "secret1").await?;

        let dup = sign_up(&db, "ana@shop.test", "another1").await;
        assert!(matches!(dup, Err(Error::EmailTaken { .. })));

        let short = sign_up(&db, "bob@shop.test", "123").await;
        assert!(matches!(short, Err(Error::Validation { .. })));

        let malformed = sign_up(&db, "not-an-email", "secret1").await;
        assert!(matches!(malformed, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password_and_unknown_email() -> Result<()> {
        let db = setup_test_db().await?;
        sign_up(&db, "ana@shop.test", "secret1").await?;

        let wrong = sign_in(&db, "ana@shop.test", "secret2").await;
        assert!(matches!(wrong, Err(Error::InvalidCredentials)));

        let unknown = sign_in(&db, "nobody@shop.test", "secret1").await;
        assert!(matches!(unknown, Err(Error::InvalidCredentials)));
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_out_revokes_session() -> Result<()> {
        let db = setup_test_db().await?;
        let session = sign_up(&db, "ana@shop.test", "secret1").await?;
        assert!(get_session(&db, &session.token).await?.is_some());

        sign_out(&db, &session.token).await?;
        assert!(get_session(&db, &session.token).await?.is_none());

        // Signing out twice is harmless
        sign_out(&db, &session.token).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_password_reset_flow() -> Result<()> {
        let db = setup_test_db().await?;
        let session = sign_up(&db, "ana@shop.test", "secret1").await?;

        assert!(request_password_reset(&db, "nobody@shop.test").await?.is_none());

        let token = request_password_reset(&db, "ana@shop.test").await?.unwrap();
        reset_password(&db, &token, "brand-new").await?;

        // Old sessions are revoked and the token is single use
        assert!(get_session(&db, &session.token).await?.is_none());
        assert!(matches!(
            reset_password(&db, &token, "again-new").await,
            Err(Error::InvalidToken)
        ));

        assert!(sign_in(&db, "ana@shop.test", "secret1").await.is_err());
        sign_in(&db, "ana@shop.test", "brand-new").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_update_password_requires_session() -> Result<()> {
        let db = setup_test_db().await?;
        let session = sign_up(&db, "ana@shop.test", "secret1").await?;

        update_password(&db, &session.token, "changed1").await?;
        sign_in(&db, "ana@shop.test", "changed1").await?;

        let anonymous = update_password(&db, "bogus-token", "changed2").await;
        assert!(matches!(anonymous, Err(Error::NotAuthenticated)));
        Ok(())
    }

    #[tokio::test]
    async fn test_bootstrap_admin_creates_then_promotes() -> Result<()> {
        let db = setup_test_db().await?;
        let bootstrap = AdminBootstrap {
            email: "owner@shop.test".to_string(),
            password: "owner-pass".to_string(),
        };

        let created = bootstrap_admin(&db, &bootstrap).await?;
        assert_eq!(created.role, Role::Admin);

        // Running again is a no-op
        let again = bootstrap_admin(&db, &bootstrap).await?;
        assert_eq!(again.id, created.id);

        let seller = sign_up(&db, "later@shop.test", "secret1").await?;
        let promoted = bootstrap_admin(
            &db,
            &AdminBootstrap {
                email: "later@shop.test".to_string(),
                password: "ignored".to_string(),
            },
        )
        .await?;
        assert_eq!(promoted.id, seller.user_id);
        assert_eq!(promoted.role, Role::Admin);
        Ok(())
    }
}
