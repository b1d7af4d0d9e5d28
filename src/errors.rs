//! Unified error type for the point-of-sale backend and client state.

use crate::entities::profile::Role;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i32 },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Insufficient stock for: {}", .products.join(", "))]
    InsufficientStock { products: Vec<String> },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("Permission denied: {action} is not allowed for role {role}")]
    Forbidden { action: String, role: Role },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already registered: {email}")]
    EmailTaken { email: String },

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Password hashing error: {message}")]
    PasswordHash { message: String },
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::PasswordHash {
            message: value.to_string(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
