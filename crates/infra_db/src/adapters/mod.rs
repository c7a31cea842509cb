//! Domain Adapters
//!
//! Adapter implementations for domain ports, connecting the billing domain's
//! store traits to PostgreSQL.
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBillingStore;
//! use domain_billing::BillingStore;
//!
//! let store: Arc<dyn BillingStore> = Arc::new(PostgresBillingStore::new(pool));
//! let mut uow = store.begin().await?;
//! ```

pub mod billing;

pub use billing::{PostgresBillingStore, PostgresUnitOfWork};
