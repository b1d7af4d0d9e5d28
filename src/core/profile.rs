//! Profile and role lookups - the authorization side of the backend.
//!
//! Every privileged operation in `core` resolves the caller's role here from the
//! `profiles` table instead of trusting a role held by the client.

use crate::{
    entities::{Profile, Role, profile},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, QueryOrder, Set, prelude::*};

/// Retrieves the profile of a user, if one exists.
pub async fn get_profile<C>(db: &C, user_id: i64) -> Result<Option<profile::Model>>
where
    C: ConnectionTrait,
{
    Profile::find_by_id(user_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the role of a user, or `None` when the user has no profile.
pub async fn get_role<C>(db: &C, user_id: i64) -> Result<Option<Role>>
where
    C: ConnectionTrait,
{
    Ok(get_profile(db, user_id).await?.map(|p| p.role))
}

/// Lists all profiles ordered by email, for seller and courier pickers.
pub async fn list_profiles(db: &DatabaseConnection) -> Result<Vec<profile::Model>> {
    Profile::find()
        .order_by_asc(profile::Column::Email)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists all profiles with couriers first, keeping email order within each group.
pub async fn list_profiles_couriers_first(
    db: &DatabaseConnection,
) -> Result<Vec<profile::Model>> {
    let mut profiles = list_profiles(db).await?;
    profiles.sort_by_key(|p| !p.role.is_courier());
    Ok(profiles)
}

/// Ensures `user_id` has one of the `allowed` roles.
///
/// # Errors
/// - [`Error::NotAuthenticated`] if the user has no profile
/// - [`Error::Forbidden`] if the role is not in `allowed`
pub async fn require_role<C>(
    db: &C,
    user_id: i64,
    allowed: &[Role],
    action: &str,
) -> Result<profile::Model>
where
    C: ConnectionTrait,
{
    let profile = get_profile(db, user_id)
        .await?
        .ok_or(Error::NotAuthenticated)?;

    if allowed.contains(&profile.role) {
        Ok(profile)
    } else {
        tracing::warn!(
            user_id,
            role = %profile.role,
            "Rejected '{action}': role not permitted"
        );
        Err(Error::Forbidden {
            action: action.to_string(),
            role: profile.role,
        })
    }
}

/// Ensures `user_id` is an admin.
pub async fn require_admin<C>(db: &C, user_id: i64, action: &str) -> Result<profile::Model>
where
    C: ConnectionTrait,
{
    require_role(db, user_id, &[Role::Admin], action).await
}

/// Changes the role of `user_id`. Only admins may do this.
pub async fn set_role(
    db: &DatabaseConnection,
    actor_id: i64,
    user_id: i64,
    role: Role,
) -> Result<profile::Model> {
    require_admin(db, actor_id, "change user role").await?;

    let mut profile: profile::ActiveModel = get_profile(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("Profile", user_id))?
        .into();
    profile.role = Set(role);
    let updated = profile.update(db).await?;
    tracing::info!(user_id, role = %role, "Role updated by {actor_id}");
    Ok(updated)
}
