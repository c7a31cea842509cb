//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! billing test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built customers, products and a seeded in-memory store
//! - `builders`: Builders for bills written straight into a store
//! - `database`: Throwaway PostgreSQL containers with the billing schema
//! - `assertions`: Assertion helpers for money and bill views
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
