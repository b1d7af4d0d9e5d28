//! Auth state mirror.
//!
//! [`AuthClient`] wraps the session functions of `core::auth` and publishes an
//! [`AuthSnapshot`] on a watch channel after every change, so views can react
//! to sign-in, sign-out and role changes.

use crate::{
    core::{
        auth::{self, AuthSession},
        profile::get_role,
    },
    entities::Role,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Current session and the role resolved for it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSnapshot {
    pub session: Option<AuthSession>,
    pub role: Option<Role>,
}

impl AuthSnapshot {
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.session.as_ref().map(|s| s.user_id)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_some_and(Role::is_admin)
    }

    #[must_use]
    pub fn is_courier(&self) -> bool {
        self.role.is_some_and(Role::is_courier)
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }
}

pub struct AuthClient<'a> {
    db: &'a DatabaseConnection,
    state: watch::Sender<AuthSnapshot>,
}

impl<'a> AuthClient<'a> {
    #[must_use]
    pub fn new(db: &'a DatabaseConnection) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::default());
        Self { db, state }
    }

    /// Receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    async fn publish_session(&self, session: Option<AuthSession>) -> Result<AuthSnapshot> {
        let role = match &session {
            Some(s) => get_role(self.db, s.user_id).await?,
            None => None,
        };
        let snapshot = AuthSnapshot { session, role };
        self.state.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSnapshot> {
        let session = auth::sign_in(self.db, email, password).await?;
        self.publish_session(Some(session)).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSnapshot> {
        let session = auth::sign_up(self.db, email, password).await?;
        self.publish_session(Some(session)).await
    }

    /// Revokes the current session, if any, and publishes a signed-out snapshot.
    pub async fn sign_out(&self) -> Result<()> {
        let token = self.state.borrow().session.as_ref().map(|s| s.token.clone());
        if let Some(token) = token {
            auth::sign_out(self.db, &token).await?;
        }
        self.state.send_replace(AuthSnapshot::default());
        Ok(())
    }

    /// Resumes a previously issued session. An unknown or revoked token yields
    /// a signed-out snapshot.
    pub async fn restore(&self, token: &str) -> Result<AuthSnapshot> {
        let session = auth::get_session(self.db, token).await?;
        if session.is_none() {
            tracing::debug!("Stored session token is no longer valid");
        }
        self.publish_session(session).await
    }

    /// Re-reads the role of the signed-in user.
    pub async fn refresh_role(&self) -> Result<AuthSnapshot> {
        let session = self.state.borrow().session.clone();
        if session.is_none() {
            return Err(Error::NotAuthenticated);
        }
        self.publish_session(session).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::profile::set_role, test_utils::*};

    #[tokio::test]
    async fn test_sign_up_publishes_seller_snapshot() -> Result<()> {
        let db = setup_test_db().await?;
        let client = AuthClient::new(&db);
        let mut rx = client.subscribe();

        let snapshot = client.sign_up("new@shop.test", "secret123").await?;
        assert!(snapshot.is_signed_in());
        assert_eq!(snapshot.role, Some(Role::Seller));
        assert!(!snapshot.is_admin());

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), snapshot);
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_out_and_restore() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "courier@shop.test", Role::Courier).await?;
        let client = AuthClient::new(&db);

        let snapshot = client.sign_in("courier@shop.test", "password123").await?;
        assert!(snapshot.is_courier());
        let token = snapshot.session.unwrap().token;

        client.sign_out().await?;
        assert_eq!(client.snapshot(), AuthSnapshot::default());

        let restored = client.restore(&token).await?;
        assert!(!restored.is_signed_in());
        assert_eq!(restored.user_id(), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_credentials_leave_state_alone() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "seller@shop.test", Role::Seller).await?;
        let client = AuthClient::new(&db);

        let result = client.sign_in("seller@shop.test", "wrong-password").await;
        assert!(matches!(result, Err(Error::InvalidCredentials)));
        assert!(!client.snapshot().is_signed_in());
        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_role_picks_up_promotion() -> Result<()> {
        let (db, admin) = setup_with_admin().await?;
        let seller = create_test_user(&db, "seller@shop.test", Role::Seller).await?;
        let client = AuthClient::new(&db);

        assert!(matches!(
            client.refresh_role().await,
            Err(Error::NotAuthenticated)
        ));

        client.sign_in("seller@shop.test", "password123").await?;
        set_role(&db, admin.id, seller.id, Role::Admin).await?;
        let snapshot = client.refresh_role().await?;
        assert!(snapshot.is_admin());
        Ok(())
    }
}
