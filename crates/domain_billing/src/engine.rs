//! Billing engine
//!
//! Orchestrates sales, returns and credit payments. Each mutating operation
//! runs in a single unit of work: every check happens before commit, and an
//! error drops the unit of work so no partial effect is persisted.

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use core_kernel::{BillId, Currency, Money, Page, PageRequest, ProductId};

use crate::bill::{Bill, BillLineItem, BillType, PaymentMethod};
use crate::credit::{self, CreditShortfallPolicy};
use crate::customer::Customer;
use crate::error::BillingError;
use crate::number::BillNumberGenerator;
use crate::product::Product;
use crate::ports::{BillQuery, BillingStore, CreditSummary, UnitOfWork};
use crate::reconciliation::ReturnReconciliation;
use crate::request::{CreateBillRequest, CreditPaymentRequest, ReturnRequest};
use crate::validation;
use crate::view::BillView;

/// Engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingConfig {
    /// Currency of every amount the engine issues
    pub currency: Currency,
    pub credit_shortfall: CreditShortfallPolicy,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            currency: Currency::USD,
            credit_shortfall: CreditShortfallPolicy::Clamp,
        }
    }
}

#[derive(Clone)]
pub struct BillingEngine {
    store: Arc<dyn BillingStore>,
    numbers: Arc<dyn BillNumberGenerator>,
    config: BillingConfig,
}

impl BillingEngine {
    pub fn new(
        store: Arc<dyn BillingStore>,
        numbers: Arc<dyn BillNumberGenerator>,
        config: BillingConfig,
    ) -> Self {
        Self { store, numbers, config }
    }

    pub fn store(&self) -> &Arc<dyn BillingStore> {
        &self.store
    }

    pub fn config(&self) -> BillingConfig {
        self.config
    }

    /// Records a sale
    ///
    /// Prices come from the catalog; client-supplied totals are never
    /// trusted. Credit sales add the bill total to the customer's balance.
    #[instrument(skip(self, request), fields(customer_id = ?request.customer_id, lines = request.lines.len()))]
    pub async fn create_bill(&self, request: CreateBillRequest) -> Result<BillView, BillingError> {
        let customer_id = request.customer_id.ok_or(BillingError::MissingCustomer)?;
        if request.lines.is_empty() {
            return Err(BillingError::EmptyBill);
        }
        let payment_method = validation::require_payment_method(request.payment_method)?;
        let currency = self.config.currency;

        let mut uow = self.store.begin().await?;
        let mut customer = uow
            .lock_customer(customer_id)
            .await?
            .ok_or_else(|| BillingError::CustomerNotFound(customer_id.to_string()))?;

        let ids = request.lines.iter().map(|l| l.product_id).collect();
        let mut products = lock_products(uow.as_mut(), ids).await?;

        let mut lines = Vec::with_capacity(request.lines.len());
        for requested in &request.lines {
            let product = products
                .get_mut(&requested.product_id)
                .ok_or(BillingError::ProductNotFound(requested.product_id))?;

            validation::validate_sale_quantity(product, requested.quantity)?;
            let discount = requested
                .discount_per_unit
                .map(|d| Money::new(d, currency))
                .unwrap_or_else(|| Money::zero(currency));
            validation::validate_discount(product, &discount)?;

            product.remove_stock(requested.quantity)?;
            validation::validate_product(product)?;

            lines.push(BillLineItem::new(
                product.id,
                product.name.clone(),
                requested.quantity,
                product.unit_price,
                discount,
            ));
        }
        save_products(uow.as_mut(), &products).await?;

        let issued_at = Utc::now();
        let bill_number = self.numbers.generate(Some(&customer.name), issued_at);
        let bill = Bill::new(bill_number, customer.id, BillType::New, payment_method, currency, issued_at)
            .with_lines(lines)?;
        validation::validate_bill(&bill)?;
        uow.save_bill(&bill).await?;

        if payment_method == PaymentMethod::Credit {
            customer.charge(&bill.total_amount)?;
            validation::validate_customer(&customer)?;
            uow.save_customer(&customer).await?;
            debug!(balance = %customer.credit_balance, "Charged credit sale");
        }

        let view = BillView::project(&bill, &customer)?;
        uow.commit().await?;

        info!(
            bill_number = %bill.bill_number,
            total = %bill.total_amount,
            payment_method = %payment_method,
            "Bill created"
        );
        Ok(view)
    }

    /// Raises a credit note against an earlier sale
    ///
    /// Returned goods are restocked and priced at the original sale's price
    /// and discount. If the original sale was a credit sale the customer's
    /// balance is reduced according to the configured shortfall policy.
    #[instrument(skip(self, request), fields(bill_number = %request.bill_number, lines = request.lines.len()))]
    pub async fn process_return(&self, request: ReturnRequest) -> Result<BillView, BillingError> {
        let original_number = request.bill_number.trim();
        if original_number.is_empty() {
            return Err(BillingError::InvalidBill(
                "bill number for return cannot be empty".to_string(),
            ));
        }
        if request.lines.is_empty() {
            return Err(BillingError::EmptyBill);
        }
        let payment_method = validation::require_payment_method(request.payment_method)?;
        let currency = self.config.currency;

        let mut uow = self.store.begin().await?;
        let mut original = uow
            .lock_bill_by_number(original_number)
            .await?
            .ok_or_else(|| BillingError::BillNotFound(original_number.to_string()))?;

        if original.bill_type == BillType::FullReturn {
            return Err(BillingError::AlreadyFullyReturned(original.bill_number.clone()));
        }
        if original.is_credit_note() || original.bill_type == BillType::CreditsPayment {
            return Err(BillingError::NotASale(original.bill_number.clone()));
        }

        let prior_returns = uow.find_return_bills(&original.bill_number).await?;
        let reconciliation = ReturnReconciliation::compute(&original, &prior_returns)?;
        let requested = reconciliation.validate_request(&request.lines)?;
        let processed = reconciliation.classify(&requested);
        debug!(?processed, prior_returns = prior_returns.len(), "Return classified");

        // Customer before products, the same lock order as a sale
        let mut customer = uow
            .lock_customer(original.customer_id)
            .await?
            .ok_or_else(|| BillingError::CustomerNotFound(original.customer_id.to_string()))?;

        let ids = request.lines.iter().map(|l| l.product_id).collect();
        let mut products = lock_products(uow.as_mut(), ids).await?;
        for line in &request.lines {
            let product = products
                .get_mut(&line.product_id)
                .ok_or(BillingError::ProductNotFound(line.product_id))?;
            product.restock(line.quantity)?;
            validation::validate_product(product)?;
        }
        save_products(uow.as_mut(), &products).await?;

        let return_lines = reconciliation.allocate_lines(&original, &request.lines)?;

        if original.record_return(processed) {
            validation::validate_bill(&original)?;
            uow.save_bill(&original).await?;
        }

        let issued_at = Utc::now();
        let bill_number = self.numbers.generate(Some(&customer.name), issued_at);
        let return_bill = Bill::new(bill_number, customer.id, processed, payment_method, currency, issued_at)
            .against(original.bill_number.clone())
            .with_lines(return_lines)?;
        validation::validate_bill(&return_bill)?;
        uow.save_bill(&return_bill).await?;

        if original.payment_method == PaymentMethod::Credit {
            let amount = credit::amount_to_reverse(&original, &return_bill, &prior_returns)?;
            let adjustment = credit::reverse_credit(&mut customer, amount, self.config.credit_shortfall)?;
            if adjustment.absorbed_shortfall.is_positive() {
                warn!(
                    customer_id = %customer.id,
                    reversed = %adjustment.reversed,
                    shortfall = %adjustment.absorbed_shortfall,
                    "Credit reversal exceeded balance; balance floored at zero"
                );
            }
            validation::validate_customer(&customer)?;
            uow.save_customer(&customer).await?;
        }

        let view = BillView::project(&return_bill, &customer)?;
        uow.commit().await?;

        info!(
            bill_number = %return_bill.bill_number,
            original = %original.bill_number,
            bill_type = %processed,
            total = %return_bill.total_amount,
            "Return processed"
        );
        Ok(view)
    }

    /// Records a payment against the customer's credit balance
    #[instrument(skip(self, request), fields(customer_id = ?request.customer_id, amount = %request.amount))]
    pub async fn create_credit_payment(&self, request: CreditPaymentRequest) -> Result<BillView, BillingError> {
        let customer_id = request.customer_id.ok_or(BillingError::MissingCustomer)?;
        let payment_method = validation::require_payment_method(request.payment_method)?;
        let amount = Money::new(request.amount, self.config.currency);

        let mut uow = self.store.begin().await?;
        let mut customer = uow
            .lock_customer(customer_id)
            .await?
            .ok_or_else(|| BillingError::CustomerNotFound(customer_id.to_string()))?;

        validation::validate_credit_payment(&customer, &amount)?;
        customer.settle(&amount)?;
        validation::validate_customer(&customer)?;
        uow.save_customer(&customer).await?;

        let issued_at = Utc::now();
        let bill_number = self.numbers.generate(Some(&customer.name), issued_at);
        let bill = Bill::new(
            bill_number,
            customer.id,
            BillType::CreditsPayment,
            payment_method,
            self.config.currency,
            issued_at,
        )
        .with_amount(amount);
        validation::validate_bill(&bill)?;
        uow.save_bill(&bill).await?;

        let view = BillView::project(&bill, &customer)?;
        uow.commit().await?;

        info!(
            bill_number = %bill.bill_number,
            amount = %amount,
            balance = %customer.credit_balance,
            "Credit payment recorded"
        );
        Ok(view)
    }

    /// Looks up one bill by number, case-insensitively
    #[instrument(skip(self))]
    pub async fn get_bill(&self, bill_number: &str) -> Result<BillView, BillingError> {
        let mut uow = self.store.begin().await?;
        let bill = uow
            .find_bill_by_number(bill_number)
            .await?
            .ok_or_else(|| BillingError::BillNotFound(bill_number.trim().to_string()))?;
        let customer = load_customer(uow.as_mut(), &bill).await?;
        BillView::project(&bill, &customer)
    }

    #[instrument(skip(self))]
    pub async fn list_bills(&self, query: BillQuery) -> Result<Page<BillView>, BillingError> {
        let mut uow = self.store.begin().await?;
        let bills = uow.list_bills(&query).await?;
        project_page(uow.as_mut(), bills).await
    }

    /// Bills of the customer owning `contact`
    #[instrument(skip(self))]
    pub async fn bills_for_customer_contact(
        &self,
        contact: &str,
        page: PageRequest,
    ) -> Result<Page<BillView>, BillingError> {
        let mut uow = self.store.begin().await?;
        let customer = uow
            .find_customer_by_contact(contact)
            .await?
            .ok_or_else(|| BillingError::CustomerNotFound(contact.trim().to_string()))?;
        let bills = uow.list_bills(&BillQuery::for_customer(customer.id, page)).await?;
        project_page(uow.as_mut(), bills).await
    }

    /// Credit notes raised against a sale, oldest first
    #[instrument(skip(self))]
    pub async fn return_history(&self, bill_number: &str) -> Result<Vec<BillView>, BillingError> {
        let mut uow = self.store.begin().await?;
        let original = uow
            .find_bill_by_number(bill_number)
            .await?
            .ok_or_else(|| BillingError::BillNotFound(bill_number.trim().to_string()))?;
        let customer = load_customer(uow.as_mut(), &original).await?;
        uow.find_return_bills(&original.bill_number)
            .await?
            .iter()
            .map(|bill| BillView::project(bill, &customer))
            .collect()
    }

    /// Removes a bill record without touching stock or credit
    #[instrument(skip(self))]
    pub async fn delete_bill(&self, id: BillId) -> Result<(), BillingError> {
        let mut uow = self.store.begin().await?;
        if !uow.delete_bill(id).await? {
            return Err(BillingError::BillNotFound(id.to_string()));
        }
        uow.commit().await?;
        warn!(bill_id = %id, "Bill record deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn credit_summary(&self) -> Result<CreditSummary, BillingError> {
        let mut uow = self.store.begin().await?;
        Ok(uow.credit_summary().await?)
    }

    #[instrument(skip(self))]
    pub async fn customers_with_credit(&self, page: PageRequest) -> Result<Page<Customer>, BillingError> {
        let mut uow = self.store.begin().await?;
        Ok(uow.customers_with_credit(page).await?)
    }
}

/// Loads and locks every distinct product in ascending id order
async fn lock_products(
    uow: &mut dyn UnitOfWork,
    ids: BTreeSet<ProductId>,
) -> Result<BTreeMap<ProductId, Product>, BillingError> {
    let mut products = BTreeMap::new();
    for id in ids {
        let product = uow
            .find_product(id)
            .await?
            .ok_or(BillingError::ProductNotFound(id))?;
        products.insert(id, product);
    }
    Ok(products)
}

async fn save_products(
    uow: &mut dyn UnitOfWork,
    products: &BTreeMap<ProductId, Product>,
) -> Result<(), BillingError> {
    for product in products.values() {
        uow.save_product(product).await?;
    }
    Ok(())
}

async fn load_customer(uow: &mut dyn UnitOfWork, bill: &Bill) -> Result<Customer, BillingError> {
    uow.find_customer(bill.customer_id).await?.ok_or_else(|| {
        BillingError::DataInconsistency(format!(
            "bill {} references missing customer {}",
            bill.bill_number, bill.customer_id
        ))
    })
}

async fn project_page(uow: &mut dyn UnitOfWork, bills: Page<Bill>) -> Result<Page<BillView>, BillingError> {
    let mut views = Vec::with_capacity(bills.items.len());
    for bill in &bills.items {
        let customer = load_customer(uow, bill).await?;
        views.push(BillView::project(bill, &customer)?);
    }
    Ok(Page {
        items: views,
        total: bills.total,
        limit: bills.limit,
        offset: bills.offset,
    })
}
