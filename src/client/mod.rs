/// Session and role mirror for a signed-in user
pub mod auth;

/// In-memory cart mirror with optimistic updates
pub mod cart;

/// The remote store seam used by the cart mirror
pub mod store;
