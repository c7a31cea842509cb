//! Billing domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{CustomerId, MoneyError, PortError, ProductId};

/// Errors that can occur in the billing domain
///
/// Every rejection is detected before the unit of work commits, so any
/// variant returned from an engine operation means nothing was persisted.
#[derive(Debug, Error)]
pub enum BillingError {
    /// The request carried no customer reference
    #[error("Customer information is missing in the bill request")]
    MissingCustomer,

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// A sale or return request with no lines
    #[error("Bill must contain at least one bill item")]
    EmptyBill,

    #[error("Quantity must be positive for product {product_id}, got {quantity}")]
    InvalidQuantity {
        product_id: ProductId,
        quantity: i32,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Insufficient stock for product {product_name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        requested: i32,
        available: i32,
    },

    #[error("Bill not found: {0}")]
    BillNotFound(String),

    #[error("Bill {0} has already been fully returned")]
    AlreadyFullyReturned(String),

    /// Return history contradicts the original sale
    #[error("Data inconsistency: {0}")]
    DataInconsistency(String),

    #[error("All items have already been returned for bill {0}")]
    NothingLeftToReturn(String),

    #[error("Product {0} is not available for return on this bill")]
    ProductNotReturnable(ProductId),

    #[error("Return quantity {requested} exceeds remaining quantity {remaining} for product {product_id}")]
    ExceedsRemainingQuantity {
        product_id: ProductId,
        requested: i64,
        remaining: i64,
    },

    #[error("Invalid credit amount {amount}: current balance is {balance}")]
    InvalidCreditAmount {
        amount: Decimal,
        balance: Decimal,
    },

    /// Structurally invalid bill (missing payment method, mismatched totals, ...)
    #[error("Invalid bill: {0}")]
    InvalidBill(String),

    #[error("Discount {discount} is not valid for product {product_id} priced {unit_price}")]
    InvalidDiscount {
        product_id: ProductId,
        discount: Decimal,
        unit_price: Decimal,
    },

    /// Returns may only be raised against sale bills
    #[error("Bill {0} is not a sale and cannot be returned against")]
    NotASale(String),

    /// A return would drive the credit balance below zero under the reject policy
    #[error("Credit reversal exceeds balance of customer {customer_id} by {shortfall}")]
    CreditLedgerShortfall {
        customer_id: CustomerId,
        shortfall: Decimal,
    },

    #[error("Calculation error: {0}")]
    Calculation(#[from] MoneyError),

    #[error("Store error: {0}")]
    Store(#[from] PortError),
}

impl BillingError {
    /// Stable machine-readable code for this failure kind
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::MissingCustomer => "missing_customer",
            BillingError::CustomerNotFound(_) => "customer_not_found",
            BillingError::EmptyBill => "empty_bill",
            BillingError::InvalidQuantity { .. } => "invalid_quantity",
            BillingError::ProductNotFound(_) => "product_not_found",
            BillingError::InsufficientStock { .. } => "insufficient_stock",
            BillingError::BillNotFound(_) => "bill_not_found",
            BillingError::AlreadyFullyReturned(_) => "already_fully_returned",
            BillingError::DataInconsistency(_) => "data_inconsistency",
            BillingError::NothingLeftToReturn(_) => "nothing_left_to_return",
            BillingError::ProductNotReturnable(_) => "product_not_returnable",
            BillingError::ExceedsRemainingQuantity { .. } => "exceeds_remaining_quantity",
            BillingError::InvalidCreditAmount { .. } => "invalid_credit_amount",
            BillingError::InvalidBill(_) => "invalid_bill",
            BillingError::InvalidDiscount { .. } => "invalid_discount",
            BillingError::NotASale(_) => "not_a_sale",
            BillingError::CreditLedgerShortfall { .. } => "credit_ledger_shortfall",
            BillingError::Calculation(_) => "calculation_error",
            BillingError::Store(_) => "store_error",
        }
    }
}
