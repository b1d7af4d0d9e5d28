/// Email/password accounts, sessions and password resets
pub mod auth;

/// Cart rows stored per user
pub mod cart;

/// Products and categories
pub mod catalog;

/// Converting a cart into an order
pub mod checkout;

/// Customer records
pub mod contact;

/// Seller and courier summaries
pub mod dashboard;

/// Capital injections and expenses
pub mod ledger;

/// Order listing, assignment, status changes and courier settlement
pub mod order;

/// Calendar date ranges
pub mod period;

/// User roles and permission checks
pub mod profile;

/// Sales reports and the daily close
pub mod report;

/// Catalog seeding from configuration
pub mod seed;

/// Product image storage
pub mod storage;
