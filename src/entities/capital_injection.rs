//! Capital injection entity - Money put into the business by its owners.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "capital_injections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub amount: f64,
    pub description: String,
    /// User who recorded the entry
    pub created_by: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
