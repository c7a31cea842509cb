//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the billing system using SQLx.
//!
//! # Architecture
//!
//! - `repositories`: stateless table access over a caller-supplied connection
//! - `adapters`: the `BillingStore` port implementation, one transaction per
//!   unit of work with row locks on the entities it mutates
//! - `pool`: connection pool creation and embedded migrations
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresBillingStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/billing")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresBillingStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use adapters::PostgresBillingStore;
