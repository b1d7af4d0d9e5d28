//! Product entity - Represents a sellable catalog item.
//!
//! Stock is decremented only by the order procedure in `core::checkout`;
//! carts read it as a soft upper bound for quantities.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product
    pub name: String,
    /// Optional description shown on the product detail page
    pub description: Option<String>,
    /// Unit sale price
    pub price: f64,
    /// Unit purchase cost, if known
    pub cost: Option<f64>,
    /// Public URL of the product image in the image bucket
    pub image_url: Option<String>,
    /// Category this product belongs to
    pub category_id: Option<i64>,
    /// Units currently available
    pub stock: i32,
    /// Whether the product is shown on the home page
    pub featured: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product optionally belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
    /// A product can sit in many carts
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
    /// A product appears on many order lines
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
