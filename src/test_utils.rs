//! Shared test utilities for `pos-hub`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        auth,
        cart::insert_cart_item,
        checkout::{CheckoutParams, create_order_from_cart},
        contact::{ContactInput, create_contact},
    },
    entities::{OrderStatus, OrderType, Role, contact, product, profile},
    errors::Result,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Password given to every user created by [`create_test_user`]
pub const TEST_PASSWORD: &str = "password123";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Routes tracing output through the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Creates an account with [`TEST_PASSWORD`] and the given role.
pub async fn create_test_user(
    db: &DatabaseConnection,
    email: &str,
    role: Role,
) -> Result<profile::Model> {
    auth::create_account(db, email, TEST_PASSWORD, role).await
}

/// Creates a fresh database with one admin account (`admin@shop.test`).
pub async fn setup_with_admin() -> Result<(DatabaseConnection, profile::Model)> {
    let db = setup_test_db().await?;
    let admin = create_test_user(&db, "admin@shop.test", Role::Admin).await?;
    Ok((db, admin))
}

/// Inserts a product directly, without going through the admin check.
///
/// # Defaults
/// * no description, cost, image or category
/// * `featured`: false
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    price: f64,
    stock: i32,
) -> Result<product::Model> {
    product::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        price: Set(price),
        cost: Set(None),
        image_url: Set(None),
        category_id: Set(None),
        stock: Set(stock),
        featured: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a contact named `name` with a matching email.
pub async fn create_test_contact(db: &DatabaseConnection, name: &str) -> Result<contact::Model> {
    create_contact(
        db,
        ContactInput {
            name: name.to_string(),
            email: Some(format!("{}@customer.test", name.to_lowercase())),
            ..ContactInput::default()
        },
    )
    .await
}

/// Rings up a paid counter sale for `user_id`.
///
/// Each `(name, price, quantity)` becomes a new product with enough stock.
pub async fn create_test_order(
    db: &DatabaseConnection,
    user_id: i64,
    lines: &[(&str, f64, i32)],
) -> Result<i64> {
    for (name, price, quantity) in lines {
        let product = create_test_product(db, name, *price, quantity + 10).await?;
        insert_cart_item(db, user_id, product.id, *quantity).await?;
    }
    create_order_from_cart(
        db,
        &CheckoutParams {
            user_id,
            contact_id: None,
            assigned_to: None,
            order_type: OrderType::Sale,
            payment_method: None,
            status: OrderStatus::Paid,
            shipping_cost: 0.0,
        },
    )
    .await
}

/// Creates a pending invoice of 10.0 (one unit of a product of its own) for a
/// new contact named `contact_name`.
pub async fn create_test_invoice(
    db: &DatabaseConnection,
    user_id: i64,
    contact_name: &str,
) -> Result<i64> {
    let contact = create_test_contact(db, contact_name).await?;
    let product = create_test_product(db, &format!("Item for {contact_name}"), 10.0, 10).await?;
    insert_cart_item(db, user_id, product.id, 1).await?;
    create_order_from_cart(
        db,
        &CheckoutParams {
            user_id,
            contact_id: Some(contact.id),
            assigned_to: None,
            order_type: OrderType::Invoice,
            payment_method: None,
            status: OrderStatus::Pending,
            shipping_cost: 0.0,
        },
    )
    .await
}
