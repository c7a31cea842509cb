//! Billing Domain - Sales, Returns and the Customer Credit Ledger
//!
//! This crate holds the business rules of the billing subsystem. It
//! reconciles three pieces of state inside one unit of work per operation:
//! product stock, the return history of an original sale, and each
//! customer's running credit balance.
//!
//! # Bill kinds
//!
//! - **NEW**: a sale; decrements stock, charges the customer when paid on credit
//! - **PARTIAL_RETURN** / **FULL_RETURN**: a credit note against an original sale;
//!   restocks goods at the original sale price and reverses credit
//! - **CREDITS_PAYMENT**: a payment against the outstanding credit balance
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{BillingEngine, BillingConfig, CreateBillRequest, SaleLine};
//!
//! let engine = BillingEngine::new(store, generator, BillingConfig::default());
//! let view = engine.create_bill(CreateBillRequest {
//!     customer_id: Some(customer_id),
//!     payment_method: Some(PaymentMethod::Credit),
//!     lines: vec![SaleLine::new(product_id, 3).with_discount(dec!(5))],
//! }).await?;
//! ```

pub mod bill;
pub mod product;
pub mod customer;
pub mod number;
pub mod validation;
pub mod reconciliation;
pub mod credit;
pub mod request;
pub mod view;
pub mod ports;
pub mod memory;
pub mod engine;
pub mod error;

pub use bill::{Bill, BillLineItem, BillType, BillStatus, PaymentMethod, ORIGINAL_BILL_NA};
pub use product::Product;
pub use customer::Customer;
pub use number::{BillNumberGenerator, UuidBillNumberGenerator, SequenceBillNumberGenerator};
pub use reconciliation::{ReturnReconciliation, QuantityMap};
pub use credit::{CreditShortfallPolicy, CreditAdjustment};
pub use request::{CreateBillRequest, SaleLine, ReturnRequest, ReturnLine, CreditPaymentRequest};
pub use view::{BillView, BillLineView};
pub use ports::{
    BillingStore, UnitOfWork, InventoryStore, CustomerLedger, BillRecordStore,
    BillQuery, CreditSummary,
};
pub use memory::InMemoryBillingStore;
pub use engine::{BillingEngine, BillingConfig};
pub use error::BillingError;
