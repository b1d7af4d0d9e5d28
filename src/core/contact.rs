//! Contact business logic - customer records used on invoices and deliveries.

use crate::{
    entities::{Contact, contact},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};

/// Editable contact fields
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ContactInput {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Contact name cannot be empty"));
        }
        Ok(())
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lists contacts alphabetically.
pub async fn list_contacts(db: &DatabaseConnection) -> Result<Vec<contact::Model>> {
    Contact::find()
        .order_by_asc(contact::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn get_contact(db: &DatabaseConnection, contact_id: i64) -> Result<Option<contact::Model>> {
    Contact::find_by_id(contact_id)
        .one(db)
        .await
        .map_err(Into::into)
}

pub async fn create_contact(db: &DatabaseConnection, input: ContactInput) -> Result<contact::Model> {
    input.validate()?;

    contact::ActiveModel {
        name: Set(input.name.trim().to_string()),
        email: Set(blank_to_none(input.email)),
        phone: Set(blank_to_none(input.phone)),
        address: Set(blank_to_none(input.address)),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

pub async fn update_contact(
    db: &DatabaseConnection,
    contact_id: i64,
    input: ContactInput,
) -> Result<contact::Model> {
    input.validate()?;

    let mut contact: contact::ActiveModel = get_contact(db, contact_id)
        .await?
        .ok_or_else(|| Error::not_found("Contact", contact_id))?
        .into();
    contact.name = Set(input.name.trim().to_string());
    contact.email = Set(blank_to_none(input.email));
    contact.phone = Set(blank_to_none(input.phone));
    contact.address = Set(blank_to_none(input.address));

    contact.update(db).await.map_err(Into::into)
}

/// Deletes a contact; orders that referenced it keep existing without a contact.
pub async fn delete_contact(db: &DatabaseConnection, contact_id: i64) -> Result<()> {
    let result = Contact::delete_by_id(contact_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Contact", contact_id));
    }
    Ok(())
}

/// Case-insensitive match on name or email.
#[must_use]
pub fn matches_search(contact: &contact::Model, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    contact.name.to_lowercase().contains(&term)
        || contact
            .email
            .as_deref()
            .is_some_and(|e| e.to_lowercase().contains(&term))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_contact_requires_name() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = create_contact(&db, ContactInput::default()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_contact_crud() -> Result<()> {
        let db = setup_test_db().await?;

        let maria = create_contact(
            &db,
            ContactInput {
                name: "Maria".to_string(),
                email: Some("  ".to_string()),
                phone: Some("809-555-0101".to_string()),
                address: None,
            },
        )
        .await?;
        assert_eq!(maria.email, None);
        create_test_contact(&db, "Ana").await?;

        let names: Vec<String> = list_contacts(&db)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Ana", "Maria"]);

        let updated = update_contact(
            &db,
            maria.id,
            ContactInput {
                name: "Maria Perez".to_string(),
                email: Some("maria@mail.test".to_string()),
                ..ContactInput::default()
            },
        )
        .await?;
        assert_eq!(updated.name, "Maria Perez");
        assert_eq!(updated.phone, None);

        delete_contact(&db, maria.id).await?;
        assert!(get_contact(&db, maria.id).await?.is_none());
        assert!(matches!(
            delete_contact(&db, maria.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_matches_search() -> Result<()> {
        let db = setup_test_db().await?;
        let contact = create_contact(
            &db,
            ContactInput {
                name: "Maria Perez".to_string(),
                email: Some("mp@mail.test".to_string()),
                ..ContactInput::default()
            },
        )
        .await?;

        assert!(matches_search(&contact, "perez"));
        assert!(matches_search(&contact, "MP@"));
        assert!(matches_search(&contact, ""));
        assert!(!matches_search(&contact, "juan"));
        Ok(())
    }
}
