//! Profile entity - The permission tier attached to an authenticated user.
//!
//! `role` is a closed enumeration stored as text. Free-text role names (from
//! configuration or older data) are parsed case-insensitively through
//! [`Role::from_str`](std::str::FromStr) and rejected when unknown.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Permission tier of a user
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access: catalog, order assignment, ledgers, reports
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Sells through the POS and earns commission on assigned orders
    #[sea_orm(string_value = "seller")]
    Seller,
    /// Delivers orders and marks them delivered or suspended
    #[sea_orm(string_value = "courier")]
    Courier,
}

impl Role {
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    #[must_use]
    pub const fn is_courier(self) -> bool {
        matches!(self, Self::Courier)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Seller => "seller",
            Self::Courier => "courier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "seller" => Ok(Self::Seller),
            "courier" => Ok(Self::Courier),
            other => Err(crate::errors::Error::validation(format!(
                "unknown role '{other}'"
            ))),
        }
    }
}

/// Profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Same id as the `users` row
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    /// Copy of the login email for pickers and listings
    pub email: String,
    pub role: Role,
    pub created_at: DateTimeUtc,
}

/// Profiles are referenced by id only; no enforced relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" Courier ".parse::<Role>().unwrap(), Role::Courier);
        assert_eq!("seller".parse::<Role>().unwrap(), Role::Seller);
    }

    #[test]
    fn test_role_parse_rejects_unknown() {
        assert!("manager".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_predicates() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Admin.is_courier());
        assert!(Role::Courier.is_courier());
        assert!(!Role::Seller.is_admin());
        assert_eq!(Role::Courier.to_string(), "courier");
    }
}
