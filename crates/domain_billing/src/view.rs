//! Read projection of a bill joined with its customer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BillId, CustomerId, Money, ProductId};

use crate::bill::{Bill, BillLineItem, BillStatus, BillType, PaymentMethod};
use crate::customer::Customer;
use crate::error::BillingError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillView {
    pub bill_id: BillId,
    pub bill_number: String,
    pub bill_date: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_contact: String,
    pub customer_email: Option<String>,
    pub bill_type: BillType,
    pub bill_status: BillStatus,
    pub payment_method: PaymentMethod,
    pub total_amount: Money,
    pub total_discount: Money,
    pub original_bill_number: String,
    pub lines: Vec<BillLineView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillLineView {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub discount_per_unit: Money,
    pub line_total: Money,
}

impl BillLineView {
    fn project(line: &BillLineItem) -> Result<Self, BillingError> {
        Ok(Self {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount_per_unit: line.discount_per_unit,
            line_total: line.line_total()?,
        })
    }
}

impl BillView {
    pub fn project(bill: &Bill, customer: &Customer) -> Result<Self, BillingError> {
        if bill.customer_id != customer.id {
            return Err(BillingError::DataInconsistency(format!(
                "bill {} belongs to customer {}, not {}",
                bill.bill_number, bill.customer_id, customer.id
            )));
        }
        Ok(Self {
            bill_id: bill.id,
            bill_number: bill.bill_number.clone(),
            bill_date: bill.created_at,
            customer_id: customer.id,
            customer_name: customer.name.clone(),
            customer_contact: customer.contact.clone(),
            customer_email: customer.email.clone(),
            bill_type: bill.bill_type,
            bill_status: bill.status,
            payment_method: bill.payment_method,
            total_amount: bill.total_amount,
            total_discount: bill.total_discount,
            original_bill_number: bill.original_bill_number.clone(),
            lines: bill
                .lines
                .iter()
                .map(BillLineView::project)
                .collect::<Result<_, _>>()?,
        })
    }
}
