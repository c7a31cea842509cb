//! Repository implementations for billing entities
//!
//! Repositories are stateless: every method takes the connection of the
//! caller's transaction, so a unit of work can span all three tables and
//! hold row locks until it commits. Queries are built at runtime with
//! `query_as` and mapped through `FromRow` row types.

pub mod product;
pub mod customer;
pub mod bill;

pub use product::{ProductRepository, ProductRow};
pub use customer::{CustomerRepository, CustomerRow};
pub use bill::{BillRepository, BillRow, BillLineRow};
