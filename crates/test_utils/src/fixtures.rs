//! Pre-built Test Fixtures
//!
//! Consistent customers, products and amounts for billing tests, plus a
//! seeded in-memory store wired to a deterministic bill number generator.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Currency, Money, PortError};
use domain_billing::{
    BillingConfig, BillingEngine, BillingStore, CreditShortfallPolicy, Customer,
    InMemoryBillingStore, Product, SequenceBillNumberGenerator,
};

/// Fixed issue time used by fixtures that need a stable bill date
pub static FIXTURE_NOW: Lazy<DateTime<Utc>> =
    Lazy::new(|| Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).single().unwrap_or_else(Utc::now));

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn usd(amount: Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    pub fn usd_100() -> Money {
        Self::usd(dec!(100.00))
    }

    /// A EUR amount for currency mismatch tests
    pub fn eur_100() -> Money {
        Money::new(dec!(100.00), Currency::EUR)
    }
}

pub struct CustomerFixtures;

impl CustomerFixtures {
    /// "Alice Doe", no outstanding credit
    pub fn alice() -> Customer {
        Customer::new("Alice Doe", "555-0100", Currency::USD).with_email("alice@example.com")
    }

    /// "Bob Roe", owing $30
    pub fn bob_with_credit() -> Customer {
        Customer::new("Bob Roe", "555-0101", Currency::USD)
            .with_credit_balance(MoneyFixtures::usd(dec!(30)))
    }

    /// A customer with a generated name and contact
    pub fn random() -> Customer {
        let name: String = Name().fake();
        let contact: String = PhoneNumber().fake();
        Customer::new(name, contact, Currency::USD)
    }
}

pub struct ProductFixtures;

impl ProductFixtures {
    /// $100.00, 10 on hand
    pub fn widget() -> Product {
        Product::new("Widget", MoneyFixtures::usd_100(), 10)
    }

    /// $40.00, 5 on hand
    pub fn gadget() -> Product {
        Product::new("Gadget", MoneyFixtures::usd(dec!(40)), 5)
    }
}

/// Seeded entities returned by [`seeded_memory_store`]
#[derive(Debug, Clone)]
pub struct SeedData {
    pub alice: Customer,
    pub bob: Customer,
    pub widget: Product,
    pub gadget: Product,
}

impl SeedData {
    pub fn new() -> Self {
        Self {
            alice: CustomerFixtures::alice(),
            bob: CustomerFixtures::bob_with_credit(),
            widget: ProductFixtures::widget(),
            gadget: ProductFixtures::gadget(),
        }
    }
}

impl Default for SeedData {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes Alice, Bob, a widget and a gadget through one committed unit of work
pub async fn seed_store(store: &dyn BillingStore) -> Result<SeedData, PortError> {
    let seed = SeedData::new();
    let mut uow = store.begin().await?;
    uow.save_customer(&seed.alice).await?;
    uow.save_customer(&seed.bob).await?;
    uow.save_product(&seed.widget).await?;
    uow.save_product(&seed.gadget).await?;
    uow.commit().await?;
    Ok(seed)
}

/// In-memory store holding the [`SeedData`] entities
pub async fn seeded_memory_store() -> (InMemoryBillingStore, SeedData) {
    let store = InMemoryBillingStore::new();
    let seed = SeedData::new();
    store.insert_customer(seed.alice.clone()).await;
    store.insert_customer(seed.bob.clone()).await;
    store.insert_product(seed.widget.clone()).await;
    store.insert_product(seed.gadget.clone()).await;
    (store, seed)
}

/// Engine over `store` with sequential bill numbers and the given shortfall policy
pub fn engine_for(store: &InMemoryBillingStore, policy: CreditShortfallPolicy) -> BillingEngine {
    BillingEngine::new(
        Arc::new(store.clone()),
        Arc::new(SequenceBillNumberGenerator::new()),
        BillingConfig {
            currency: Currency::USD,
            credit_shortfall: policy,
        },
    )
}
