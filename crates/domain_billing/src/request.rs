//! Engine operation inputs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{CustomerId, ProductId};

use crate::bill::PaymentMethod;

/// Request to record a sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBillRequest {
    pub customer_id: Option<CustomerId>,
    pub payment_method: Option<PaymentMethod>,
    pub lines: Vec<SaleLine>,
}

/// One requested sale line; price comes from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub quantity: i32,
    /// Per-unit discount, zero when absent
    pub discount_per_unit: Option<Decimal>,
}

impl SaleLine {
    pub fn new(product_id: ProductId, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
            discount_per_unit: None,
        }
    }

    pub fn with_discount(mut self, discount_per_unit: Decimal) -> Self {
        self.discount_per_unit = Some(discount_per_unit);
        self
    }
}

/// Request to return goods from an earlier sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRequest {
    /// Number of the original sale, matched case-insensitively
    pub bill_number: String,
    pub payment_method: Option<PaymentMethod>,
    pub lines: Vec<ReturnLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

impl ReturnLine {
    pub fn new(product_id: ProductId, quantity: i32) -> Self {
        Self { product_id, quantity }
    }
}

/// Request to pay down a customer's credit balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditPaymentRequest {
    pub customer_id: Option<CustomerId>,
    pub amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
}
