//! Domain models backed by the database.

pub mod inventory;
pub mod order;
pub mod product;
pub mod user;

pub use inventory::LedgerEntry;
pub use order::{Order, OrderLine};
pub use product::Product;
pub use user::User;
