//! Store ports for the billing domain
//!
//! Every engine operation runs inside one [`UnitOfWork`] obtained from a
//! [`BillingStore`]. Reads and writes go through the unit of work and become
//! visible to other operations only on [`UnitOfWork::commit`]; dropping an
//! uncommitted unit of work discards its writes.
//!
//! Implementations must serialize units of work that touch the same original
//! bill, product or customer. The Postgres adapter uses row locks; the
//! in-memory store serializes all units of work.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{
    BillId, CustomerId, DomainPort, HealthCheckable, Page, PageRequest, PortError, ProductId,
};

use crate::bill::Bill;
use crate::customer::Customer;
use crate::product::Product;

/// Filter for bill listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillQuery {
    /// Case-insensitive substring matched against bill number, customer name,
    /// customer contact, bill type, payment method and original bill number
    pub search: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub page: PageRequest,
}

impl BillQuery {
    pub fn for_customer(customer_id: CustomerId, page: PageRequest) -> Self {
        Self {
            search: None,
            customer_id: Some(customer_id),
            page,
        }
    }

    /// Normalized search term, `None` when blank
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Aggregate of outstanding customer credit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreditSummary {
    /// Customers with a balance above zero
    pub customers_with_credit: u64,
    pub total_credit: Decimal,
    pub average_credit: Decimal,
}

#[async_trait]
pub trait InventoryStore: Send {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, PortError>;

    async fn save_product(&mut self, product: &Product) -> Result<(), PortError>;
}

#[async_trait]
pub trait CustomerLedger: Send {
    async fn find_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, PortError>;

    /// Like [`find_customer`](Self::find_customer), holding the customer
    /// against concurrent balance changes until the unit of work ends
    async fn lock_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, PortError> {
        self.find_customer(id).await
    }

    async fn find_customer_by_contact(&mut self, contact: &str) -> Result<Option<Customer>, PortError>;

    async fn save_customer(&mut self, customer: &Customer) -> Result<(), PortError>;

    async fn credit_summary(&mut self) -> Result<CreditSummary, PortError>;

    /// Customers with a positive balance, largest balance first
    async fn customers_with_credit(&mut self, page: PageRequest) -> Result<Page<Customer>, PortError>;
}

#[async_trait]
pub trait BillRecordStore: Send {
    /// Looks up a bill by number, case-insensitively
    async fn find_bill_by_number(&mut self, number: &str) -> Result<Option<Bill>, PortError>;

    /// Like [`find_bill_by_number`](Self::find_bill_by_number), holding the
    /// bill against concurrent returns until the unit of work ends
    async fn lock_bill_by_number(&mut self, number: &str) -> Result<Option<Bill>, PortError> {
        self.find_bill_by_number(number).await
    }

    /// Credit notes raised against `original_number`, oldest first
    async fn find_return_bills(&mut self, original_number: &str) -> Result<Vec<Bill>, PortError>;

    /// Inserts a new bill with its lines, or updates the header of an existing one
    ///
    /// Fails with `PortError::Conflict` if another bill already has the number.
    async fn save_bill(&mut self, bill: &Bill) -> Result<(), PortError>;

    /// Returns false if no bill had this id
    async fn delete_bill(&mut self, id: BillId) -> Result<bool, PortError>;

    /// Bills matching the query, newest first
    async fn list_bills(&mut self, query: &BillQuery) -> Result<Page<Bill>, PortError>;
}

/// One atomic scope over inventory, customers and bills
#[async_trait]
pub trait UnitOfWork: InventoryStore + CustomerLedger + BillRecordStore {
    async fn commit(self: Box<Self>) -> Result<(), PortError>;
}

/// Factory for units of work
#[async_trait]
pub trait BillingStore: DomainPort + HealthCheckable {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_term_normalization() {
        let query = BillQuery {
            search: Some("  AD0101 ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.search_term().as_deref(), Some("ad0101"));

        let blank = BillQuery {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.search_term().is_none());
    }
}
