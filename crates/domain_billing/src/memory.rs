//! In-memory billing store
//!
//! Serializes units of work behind one async mutex. Each unit of work edits a
//! private copy of the state that replaces the shared state on commit, so a
//! dropped unit of work leaves nothing behind. Used by tests and by the
//! server when configured with the `memory` backend.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::{
    AdapterHealth, BillId, CustomerId, DomainPort, HealthCheckResult, HealthCheckable, Page,
    PageRequest, PortError, ProductId,
};

use crate::bill::Bill;
use crate::customer::Customer;
use crate::ports::{
    BillQuery, BillRecordStore, BillingStore, CreditSummary, CustomerLedger, InventoryStore,
    UnitOfWork,
};
use crate::product::Product;

#[derive(Debug, Clone, Default)]
struct StoreState {
    products: HashMap<ProductId, Product>,
    customers: HashMap<CustomerId, Customer>,
    bills: HashMap<BillId, Bill>,
}

impl StoreState {
    fn bill_matches(&self, bill: &Bill, term: &str) -> bool {
        let customer = self.customers.get(&bill.customer_id);
        [
            Some(bill.bill_number.as_str()),
            customer.map(|c| c.name.as_str()),
            customer.map(|c| c.contact.as_str()),
            Some(bill.bill_type.as_str()),
            Some(bill.payment_method.as_str()),
            Some(bill.original_bill_number.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(term))
    }
}

fn page_of<T: Clone>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let window = items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect();
    Page::new(window, total, page)
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    pub async fn insert_customer(&self, customer: Customer) {
        self.state.lock().await.customers.insert(customer.id, customer);
    }

    pub async fn insert_bill(&self, bill: Bill) {
        self.state.lock().await.bills.insert(bill.id, bill);
    }

    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.state.lock().await.products.get(&id).cloned()
    }

    pub async fn customer(&self, id: CustomerId) -> Option<Customer> {
        self.state.lock().await.customers.get(&id).cloned()
    }

    pub async fn bill(&self, number: &str) -> Option<Bill> {
        self.state
            .lock()
            .await
            .bills
            .values()
            .find(|b| b.has_number(number))
            .cloned()
    }

    pub async fn bill_count(&self) -> usize {
        self.state.lock().await.bills.len()
    }
}

impl DomainPort for InMemoryBillingStore {}

#[async_trait]
impl HealthCheckable for InMemoryBillingStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let _guard = self.state.lock().await;
        HealthCheckResult {
            adapter_id: "memory-billing-store".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: start.elapsed().as_millis() as u64,
            message: None,
            checked_at: chrono::Utc::now(),
        }
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, PortError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork { guard, working }))
    }
}

/// Unit of work over an exclusive snapshot of the in-memory state
pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<StoreState>,
    working: StoreState,
}

#[async_trait]
impl InventoryStore for InMemoryUnitOfWork {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, PortError> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn save_product(&mut self, product: &Product) -> Result<(), PortError> {
        self.working.products.insert(product.id, product.clone());
        Ok(())
    }
}

#[async_trait]
impl CustomerLedger for InMemoryUnitOfWork {
    async fn find_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, PortError> {
        Ok(self.working.customers.get(&id).cloned())
    }

    async fn find_customer_by_contact(&mut self, contact: &str) -> Result<Option<Customer>, PortError> {
        let contact = contact.trim();
        Ok(self
            .working
            .customers
            .values()
            .find(|c| c.contact == contact)
            .cloned())
    }

    async fn save_customer(&mut self, customer: &Customer) -> Result<(), PortError> {
        let duplicate = self
            .working
            .customers
            .values()
            .any(|c| c.id != customer.id && c.contact == customer.contact);
        if duplicate {
            return Err(PortError::conflict(format!(
                "contact {} already belongs to another customer",
                customer.contact
            )));
        }
        self.working.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn credit_summary(&mut self) -> Result<CreditSummary, PortError> {
        let balances: Vec<Decimal> = self
            .working
            .customers
            .values()
            .filter(|c| c.has_credit())
            .map(|c| c.credit_balance.amount())
            .collect();
        let total: Decimal = balances.iter().sum();
        let count = balances.len() as u64;
        let average = if count == 0 {
            Decimal::ZERO
        } else {
            (total / Decimal::from(count)).round_dp(4)
        };
        Ok(CreditSummary {
            customers_with_credit: count,
            total_credit: total,
            average_credit: average,
        })
    }

    async fn customers_with_credit(&mut self, page: PageRequest) -> Result<Page<Customer>, PortError> {
        let mut customers: Vec<Customer> = self
            .working
            .customers
            .values()
            .filter(|c| c.has_credit())
            .cloned()
            .collect();
        customers.sort_by(|a, b| {
            b.credit_balance
                .amount()
                .cmp(&a.credit_balance.amount())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(page_of(customers, page))
    }
}

#[async_trait]
impl BillRecordStore for InMemoryUnitOfWork {
    async fn find_bill_by_number(&mut self, number: &str) -> Result<Option<Bill>, PortError> {
        Ok(self
            .working
            .bills
            .values()
            .find(|b| b.has_number(number))
            .cloned())
    }

    async fn find_return_bills(&mut self, original_number: &str) -> Result<Vec<Bill>, PortError> {
        let original_number = original_number.trim();
        let mut bills: Vec<Bill> = self
            .working
            .bills
            .values()
            .filter(|b| {
                b.original_bill_number()
                    .is_some_and(|n| n.eq_ignore_ascii_case(original_number))
            })
            .cloned()
            .collect();
        bills.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(bills)
    }

    async fn save_bill(&mut self, bill: &Bill) -> Result<(), PortError> {
        let duplicate = self
            .working
            .bills
            .values()
            .any(|b| b.id != bill.id && b.has_number(&bill.bill_number));
        if duplicate {
            return Err(PortError::conflict(format!(
                "bill number {} already exists",
                bill.bill_number
            )));
        }
        self.working.bills.insert(bill.id, bill.clone());
        Ok(())
    }

    async fn delete_bill(&mut self, id: BillId) -> Result<bool, PortError> {
        Ok(self.working.bills.remove(&id).is_some())
    }

    async fn list_bills(&mut self, query: &BillQuery) -> Result<Page<Bill>, PortError> {
        let term = query.search_term();
        let mut bills: Vec<Bill> = self
            .working
            .bills
            .values()
            .filter(|b| query.customer_id.map_or(true, |id| b.customer_id == id))
            .filter(|b| {
                term.as_deref()
                    .map_or(true, |t| self.working.bill_matches(b, t))
            })
            .cloned()
            .collect();
        bills.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.bill_number.cmp(&a.bill_number))
        });
        Ok(page_of(bills, query.page))
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let InMemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{Currency, Money};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_uncommitted_work_is_discarded() {
        let store = InMemoryBillingStore::new();
        let product = Product::new("Widget", Money::new(dec!(10), Currency::USD), 5);
        store.insert_product(product.clone()).await;

        {
            let mut uow = store.begin().await.unwrap();
            let mut changed = uow.find_product(product.id).await.unwrap().unwrap();
            changed.remove_stock(2).unwrap();
            uow.save_product(&changed).await.unwrap();
        }
        assert_eq!(store.product(product.id).await.unwrap().quantity_on_hand, 5);

        let mut uow = store.begin().await.unwrap();
        let mut changed = uow.find_product(product.id).await.unwrap().unwrap();
        changed.remove_stock(2).unwrap();
        uow.save_product(&changed).await.unwrap();
        uow.commit().await.unwrap();
        assert_eq!(store.product(product.id).await.unwrap().quantity_on_hand, 3);
    }

    #[tokio::test]
    async fn test_credit_summary() {
        let store = InMemoryBillingStore::new();
        for (name, contact, balance) in [
            ("Alice Doe", "555-0100", dec!(100)),
            ("Bob Roe", "555-0101", dec!(50)),
            ("Carol Poe", "555-0102", dec!(0)),
        ] {
            let customer = Customer::new(name, contact, Currency::USD)
                .with_credit_balance(Money::new(balance, Currency::USD));
            store.insert_customer(customer).await;
        }

        let mut uow = store.begin().await.unwrap();
        let summary = uow.credit_summary().await.unwrap();
        assert_eq!(summary.customers_with_credit, 2);
        assert_eq!(summary.total_credit, dec!(150));
        assert_eq!(summary.average_credit, dec!(75));

        let page = uow.customers_with_credit(PageRequest::default()).await.unwrap();
        assert_eq!(page.items[0].name, "Alice Doe");
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_duplicate_contact_conflicts() {
        let store = InMemoryBillingStore::new();
        store
            .insert_customer(Customer::new("Alice Doe", "555-0100", Currency::USD))
            .await;

        let mut uow = store.begin().await.unwrap();
        let err = uow
            .save_customer(&Customer::new("Alan Doe", "555-0100", Currency::USD))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict { .. }));
    }
}
