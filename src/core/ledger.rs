//! Capital injections and expenses. Every write is admin only.

use crate::{
    core::profile::require_admin,
    entities::{CapitalInjection, Expense, capital_injection, expense},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Category used when an expense is recorded without one
pub const DEFAULT_EXPENSE_CATEGORY: &str = "Other";

fn validate_entry(amount: f64, description: &str) -> Result<String> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    let description = description.trim();
    if description.is_empty() {
        return Err(Error::validation("description is required"));
    }
    Ok(description.to_string())
}

pub async fn record_capital_injection(
    db: &DatabaseConnection,
    actor_id: i64,
    amount: f64,
    description: &str,
) -> Result<capital_injection::Model> {
    let description = validate_entry(amount, description)?;
    require_admin(db, actor_id, "record capital injection").await?;

    let entry = capital_injection::ActiveModel {
        amount: Set(amount),
        description: Set(description),
        created_by: Set(actor_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(id = entry.id, amount, "Capital injection recorded");
    Ok(entry)
}

/// Newest first.
pub async fn list_capital_injections(
    db: &DatabaseConnection,
) -> Result<Vec<capital_injection::Model>> {
    CapitalInjection::find()
        .order_by_desc(capital_injection::Column::CreatedAt)
        .order_by_desc(capital_injection::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn total_capital(db: &DatabaseConnection) -> Result<f64> {
    let entries = CapitalInjection::find().all(db).await?;
    Ok(entries.iter().map(|e| e.amount).sum())
}

/// Records an expense. A blank or missing category is stored as
/// [`DEFAULT_EXPENSE_CATEGORY`].
pub async fn record_expense(
    db: &DatabaseConnection,
    actor_id: i64,
    amount: f64,
    description: &str,
    category: Option<&str>,
) -> Result<expense::Model> {
    let description = validate_entry(amount, description)?;
    require_admin(db, actor_id, "record expense").await?;

    let category = category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_EXPENSE_CATEGORY)
        .to_string();

    let entry = expense::ActiveModel {
        amount: Set(amount),
        description: Set(description),
        category: Set(category),
        created_by: Set(actor_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(id = entry.id, amount, category = %entry.category, "Expense recorded");
    Ok(entry)
}

pub async fn list_expenses(db: &DatabaseConnection) -> Result<Vec<expense::Model>> {
    Expense::find()
        .order_by_desc(expense::Column::CreatedAt)
        .order_by_desc(expense::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn total_expenses(db: &DatabaseConnection) -> Result<f64> {
    let entries = Expense::find().all(db).await?;
    Ok(entries.iter().map(|e| e.amount).sum())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{entities::Role, test_utils::*};

    #[tokio::test]
    async fn test_capital_injections() -> Result<()> {
        let (db, admin) = setup_with_admin().await?;
        record_capital_injection(&db, admin.id, 1000.0, "Opening float").await?;
        record_capital_injection(&db, admin.id, 500.0, "Second round").await?;

        let entries = list_capital_injections(&db).await?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description, "Second round");
        assert_eq!(total_capital(&db).await?, 1500.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_expense_defaults_and_validation() -> Result<()> {
        let (db, admin) = setup_with_admin().await?;

        let rent = record_expense(&db, admin.id, 300.0, "Rent", Some("Premises")).await?;
        assert_eq!(rent.category, "Premises");
        let misc = record_expense(&db, admin.id, 20.0, "Tape", Some("  ")).await?;
        assert_eq!(misc.category, DEFAULT_EXPENSE_CATEGORY);

        assert!(matches!(
            record_expense(&db, admin.id, 0.0, "Nothing", None).await,
            Err(Error::InvalidAmount { .. })
        ));
        assert!(matches!(
            record_expense(&db, admin.id, f64::NAN, "Broken", None).await,
            Err(Error::InvalidAmount { .. })
        ));
        assert!(matches!(
            record_expense(&db, admin.id, 5.0, "   ", None).await,
            Err(Error::Validation { .. })
        ));

        assert_eq!(list_expenses(&db).await?.len(), 2);
        assert_eq!(total_expenses(&db).await?, 320.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_ledger_is_admin_only() -> Result<()> {
        let db = setup_test_db().await?;
        let seller = create_test_user(&db, "seller@shop.test", Role::Seller).await?;

        let result = record_capital_injection(&db, seller.id, 100.0, "Sneaky").await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));
        let result = record_expense(&db, seller.id, 100.0, "Sneaky", None).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));
        assert!(list_expenses(&db).await?.is_empty());
        Ok(())
    }
}
