//! Bootstrap admin credentials from environment variables.
//!
//! `POS_ADMIN_EMAIL` and `POS_ADMIN_PASSWORD` name an account that is created
//! (or promoted) to admin at startup. Both must be set for it to apply.

/// Credentials of the account promoted to admin on startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

/// Reads the bootstrap admin from the environment.
///
/// # Returns
///
/// `Some` only when both variables are present and non-empty.
#[must_use]
pub fn get_admin_bootstrap() -> Option<AdminBootstrap> {
    admin_bootstrap_from(
        std::env::var("POS_ADMIN_EMAIL").ok(),
        std::env::var("POS_ADMIN_PASSWORD").ok(),
    )
}

fn admin_bootstrap_from(email: Option<String>, password: Option<String>) -> Option<AdminBootstrap> {
    match (email, password) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            Some(AdminBootstrap { email, password })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_requires_both_values() {
        assert!(admin_bootstrap_from(Some("a@b.c".into()), None).is_none());
        assert!(admin_bootstrap_from(None, Some("secret".into())).is_none());
        assert!(admin_bootstrap_from(Some("  ".into()), Some("secret".into())).is_none());
        assert_eq!(
            admin_bootstrap_from(Some("a@b.c".into()), Some("secret".into())),
            Some(AdminBootstrap {
                email: "a@b.c".into(),
                password: "secret".into(),
            })
        );
    }
}
