//! Catalog seeding for the in-memory store
//!
//! No route creates customers or products, so a `memory` backend is only
//! usable once it has been loaded from a seed file:
//!
//! ```json
//! {
//!   "customers": [{ "name": "Alice Doe", "contact": "555-0100", "credit_balance": "0" }],
//!   "products": [{ "name": "Widget", "unit_price": "100.00", "quantity_on_hand": 10 }]
//! }
//! ```

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use core_kernel::{Currency, Money};
use domain_billing::{validation, BillingError, Customer, InMemoryBillingStore, Product};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid seed entry: {0}")]
    Invalid(#[from] BillingError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedCustomer {
    pub name: String,
    pub contact: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub credit_balance: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub unit_price: Decimal,
    pub quantity_on_hand: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub customers: Vec<SeedCustomer>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

/// Entities a seed file loaded, with their generated ids
#[derive(Debug, Clone)]
pub struct SeededCatalog {
    pub customers: Vec<Customer>,
    pub products: Vec<Product>,
}

impl SeedFile {
    pub fn parse(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds every entity in `currency` and validates it before anything is inserted
    pub fn entities(&self, currency: Currency) -> Result<(Vec<Customer>, Vec<Product>), SeedError> {
        let customers = self
            .customers
            .iter()
            .map(|c| {
                let mut customer = Customer::new(c.name.trim(), c.contact.trim(), currency)
                    .with_credit_balance(Money::new(c.credit_balance, currency));
                if let Some(email) = &c.email {
                    customer = customer.with_email(email.trim());
                }
                validation::validate_customer(&customer)?;
                Ok(customer)
            })
            .collect::<Result<Vec<_>, SeedError>>()?;

        let products = self
            .products
            .iter()
            .map(|p| {
                let product = Product::new(
                    p.name.trim(),
                    Money::new(p.unit_price, currency),
                    p.quantity_on_hand,
                );
                validation::validate_product(&product)?;
                Ok(product)
            })
            .collect::<Result<Vec<_>, SeedError>>()?;

        Ok((customers, products))
    }

    pub async fn load_into(
        &self,
        store: &InMemoryBillingStore,
        currency: Currency,
    ) -> Result<SeededCatalog, SeedError> {
        let (customers, products) = self.entities(currency)?;
        for customer in &customers {
            store.insert_customer(customer.clone()).await;
        }
        for product in &products {
            store.insert_product(product.clone()).await;
        }
        Ok(SeededCatalog { customers, products })
    }
}
