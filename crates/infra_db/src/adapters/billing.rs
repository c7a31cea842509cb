//! PostgreSQL Billing Store
//!
//! Implements the billing domain's `BillingStore` port. Each unit of work is
//! one READ COMMITTED transaction. Products, customers and the original bill
//! of a return are read with `SELECT ... FOR UPDATE`, so concurrent
//! operations touching the same rows queue behind each other until commit
//! or rollback.
//!
//! # Error Handling
//!
//! Database errors are translated to `PortError` variants:
//! - unique violations and deadlocks -> `PortError::Conflict`
//! - check and foreign key violations -> `PortError::Validation`
//! - connection failures -> `PortError::Connection`
//! - everything else -> `PortError::Internal`

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, BillId, CustomerId, DomainPort, HealthCheckResult, HealthCheckable, Page,
    PageRequest, PortError, ProductId,
};
use domain_billing::{
    Bill, BillQuery, BillRecordStore, BillingStore, CreditSummary, Customer, CustomerLedger,
    InventoryStore, Product, UnitOfWork,
};

use crate::error::DatabaseError;
use crate::repositories::{BillRepository, CustomerRepository, ProductRepository};

const ADAPTER_ID: &str = "postgres-billing-store";

/// PostgreSQL-backed implementation of the BillingStore port
#[derive(Debug, Clone)]
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PostgresBillingStore {}

#[async_trait]
impl HealthCheckable for PostgresBillingStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;
        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };

        HealthCheckResult {
            adapter_id: ADAPTER_ID.to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    #[instrument(skip(self))]
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        debug!("Unit of work started");
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }
}

/// One database transaction; rolled back when dropped without commit
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl InventoryStore for PostgresUnitOfWork {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, PortError> {
        Ok(ProductRepository::find_for_update(&mut self.tx, id).await?)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    async fn save_product(&mut self, product: &Product) -> Result<(), PortError> {
        Ok(ProductRepository::upsert(&mut self.tx, product).await?)
    }
}

#[async_trait]
impl CustomerLedger for PostgresUnitOfWork {
    #[instrument(skip(self), fields(customer_id = %id))]
    async fn find_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, PortError> {
        Ok(CustomerRepository::find(&mut self.tx, id, false).await?)
    }

    #[instrument(skip(self), fields(customer_id = %id))]
    async fn lock_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, PortError> {
        Ok(CustomerRepository::find(&mut self.tx, id, true).await?)
    }

    #[instrument(skip(self))]
    async fn find_customer_by_contact(&mut self, contact: &str) -> Result<Option<Customer>, PortError> {
        Ok(CustomerRepository::find_by_contact(&mut self.tx, contact).await?)
    }

    #[instrument(skip(self, customer), fields(customer_id = %customer.id))]
    async fn save_customer(&mut self, customer: &Customer) -> Result<(), PortError> {
        Ok(CustomerRepository::upsert(&mut self.tx, customer).await?)
    }

    #[instrument(skip(self))]
    async fn credit_summary(&mut self) -> Result<CreditSummary, PortError> {
        Ok(CustomerRepository::credit_summary(&mut self.tx).await?)
    }

    #[instrument(skip(self))]
    async fn customers_with_credit(&mut self, page: PageRequest) -> Result<Page<Customer>, PortError> {
        let (customers, total) = CustomerRepository::with_credit(&mut self.tx, page).await?;
        Ok(Page::new(customers, total, page))
    }
}

#[async_trait]
impl BillRecordStore for PostgresUnitOfWork {
    #[instrument(skip(self))]
    async fn find_bill_by_number(&mut self, number: &str) -> Result<Option<Bill>, PortError> {
        Ok(BillRepository::find_by_number(&mut self.tx, number, false).await?)
    }

    #[instrument(skip(self))]
    async fn lock_bill_by_number(&mut self, number: &str) -> Result<Option<Bill>, PortError> {
        Ok(BillRepository::find_by_number(&mut self.tx, number, true).await?)
    }

    #[instrument(skip(self))]
    async fn find_return_bills(&mut self, original_number: &str) -> Result<Vec<Bill>, PortError> {
        Ok(BillRepository::find_returns(&mut self.tx, original_number).await?)
    }

    #[instrument(skip(self, bill), fields(bill_number = %bill.bill_number))]
    async fn save_bill(&mut self, bill: &Bill) -> Result<(), PortError> {
        if BillRepository::exists(&mut self.tx, bill.id).await? {
            BillRepository::update_header(&mut self.tx, bill).await?;
        } else {
            BillRepository::insert(&mut self.tx, bill).await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(bill_id = %id))]
    async fn delete_bill(&mut self, id: BillId) -> Result<bool, PortError> {
        Ok(BillRepository::delete(&mut self.tx, id).await?)
    }

    #[instrument(skip(self))]
    async fn list_bills(&mut self, query: &BillQuery) -> Result<Page<Bill>, PortError> {
        let (bills, total) = BillRepository::search(&mut self.tx, query).await?;
        Ok(Page::new(bills, total, query.page))
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.tx.commit().await.map_err(DatabaseError::from)?;
        debug!("Unit of work committed");
        Ok(())
    }
}
