//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities mirror the tables of the hosted data service.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod capital_injection;
pub mod cart_item;
pub mod category;
pub mod contact;
pub mod expense;
pub mod order;
pub mod order_item;
pub mod password_reset;
pub mod product;
pub mod profile;
pub mod session;
pub mod user;

// Re-export specific types to avoid conflicts
pub use capital_injection::{Entity as CapitalInjection, Model as CapitalInjectionModel};
pub use cart_item::{Column as CartItemColumn, Entity as CartItem, Model as CartItemModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use contact::{Column as ContactColumn, Entity as Contact, Model as ContactModel};
pub use expense::{Entity as Expense, Model as ExpenseModel};
pub use order::{
    Column as OrderColumn, Entity as Order, Model as OrderModel, OrderStatus, OrderType,
    PaymentMethod,
};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use password_reset::{Entity as PasswordReset, Model as PasswordResetModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use profile::{Column as ProfileColumn, Entity as Profile, Model as ProfileModel, Role};
pub use session::{Entity as Session, Model as SessionModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
