//! Test Data Builders
//!
//! Builders for bills and engine requests with sensible defaults, so tests
//! only spell out the fields they care about.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use core_kernel::{Currency, CustomerId, Money, ProductId};
use domain_billing::{
    Bill, BillLineItem, BillType, CreateBillRequest, PaymentMethod, Product, ReturnLine,
    ReturnRequest, SaleLine,
};

use crate::fixtures::FIXTURE_NOW;

/// Builds a [`Bill`] directly, bypassing the engine
///
/// Useful for seeding stores with history the engine would refuse to create.
pub struct BillBuilder {
    bill_number: String,
    customer_id: CustomerId,
    bill_type: BillType,
    payment_method: PaymentMethod,
    created_at: DateTime<Utc>,
    original_bill_number: Option<String>,
    lines: Vec<BillLineItem>,
    amount: Option<Money>,
}

impl BillBuilder {
    pub fn sale(bill_number: impl Into<String>, customer_id: CustomerId) -> Self {
        Self {
            bill_number: bill_number.into(),
            customer_id,
            bill_type: BillType::New,
            payment_method: PaymentMethod::Cash,
            created_at: *FIXTURE_NOW,
            original_bill_number: None,
            lines: Vec::new(),
            amount: None,
        }
    }

    /// A credit note against `original`
    pub fn credit_note(bill_number: impl Into<String>, original: &Bill, bill_type: BillType) -> Self {
        Self {
            bill_type,
            original_bill_number: Some(original.bill_number.clone()),
            ..Self::sale(bill_number, original.customer_id)
        }
    }

    pub fn paid_by(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Adds a line priced at the product's current price
    pub fn line(self, product: &Product, quantity: i32) -> Self {
        self.discounted_line(product, quantity, Decimal::ZERO)
    }

    pub fn discounted_line(mut self, product: &Product, quantity: i32, discount: Decimal) -> Self {
        let currency = product.unit_price.currency();
        self.lines.push(BillLineItem::new(
            product.id,
            product.name.clone(),
            quantity,
            product.unit_price,
            Money::new(discount, currency),
        ));
        self
    }

    /// Makes this a line-less credit payment of `amount`
    pub fn credit_payment(mut self, amount: Money) -> Self {
        self.bill_type = BillType::CreditsPayment;
        self.amount = Some(amount);
        self
    }

    pub fn build(self) -> Bill {
        let currency = self
            .lines
            .first()
            .map(|l| l.unit_price.currency())
            .or(self.amount.map(|a| a.currency()))
            .unwrap_or(Currency::USD);
        let mut bill = Bill::new(
            self.bill_number,
            self.customer_id,
            self.bill_type,
            self.payment_method,
            currency,
            self.created_at,
        );
        if let Some(original) = self.original_bill_number {
            bill = bill.against(original);
        }
        if let Some(amount) = self.amount {
            bill = bill.with_amount(amount);
        }
        bill.with_lines(self.lines)
            .expect("builder lines share one currency")
    }
}

/// Builds a [`CreateBillRequest`]
pub struct SaleRequestBuilder {
    request: CreateBillRequest,
}

impl SaleRequestBuilder {
    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self {
            request: CreateBillRequest {
                customer_id: Some(customer_id),
                payment_method: Some(PaymentMethod::Cash),
                lines: Vec::new(),
            },
        }
    }

    pub fn paid_by(mut self, method: PaymentMethod) -> Self {
        self.request.payment_method = Some(method);
        self
    }

    pub fn line(mut self, product_id: ProductId, quantity: i32) -> Self {
        self.request.lines.push(SaleLine::new(product_id, quantity));
        self
    }

    pub fn discounted_line(mut self, product_id: ProductId, quantity: i32, discount: Decimal) -> Self {
        self.request
            .lines
            .push(SaleLine::new(product_id, quantity).with_discount(discount));
        self
    }

    pub fn build(self) -> CreateBillRequest {
        self.request
    }
}

/// Builds a [`ReturnRequest`]
pub struct ReturnRequestBuilder {
    request: ReturnRequest,
}

impl ReturnRequestBuilder {
    pub fn against(bill_number: impl Into<String>) -> Self {
        Self {
            request: ReturnRequest {
                bill_number: bill_number.into(),
                payment_method: Some(PaymentMethod::Cash),
                lines: Vec::new(),
            },
        }
    }

    pub fn line(mut self, product_id: ProductId, quantity: i32) -> Self {
        self.request.lines.push(ReturnLine::new(product_id, quantity));
        self
    }

    pub fn build(self) -> ReturnRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{CustomerFixtures, ProductFixtures};
    use rust_decimal_macros::dec;

    #[test]
    fn test_bill_builder_totals() {
        let customer = CustomerFixtures::alice();
        let widget = ProductFixtures::widget();
        let bill = BillBuilder::sale("AD010124-0001", customer.id)
            .discounted_line(&widget, 3, dec!(5))
            .build();
        assert_eq!(bill.total_amount.amount(), dec!(285));
        assert_eq!(bill.total_discount.amount(), dec!(15));
    }

    #[test]
    fn test_credit_note_builder() {
        let customer = CustomerFixtures::alice();
        let widget = ProductFixtures::widget();
        let sale = BillBuilder::sale("AD010124-0001", customer.id).line(&widget, 2).build();
        let note = BillBuilder::credit_note("AD010124-0002", &sale, BillType::PartialReturn)
            .line(&widget, 1)
            .build();
        assert_eq!(note.original_bill_number(), Some("AD010124-0001"));
        assert_eq!(note.customer_id, customer.id);
    }

    #[test]
    fn test_request_builders() {
        let widget = ProductFixtures::widget();
        let sale = SaleRequestBuilder::for_customer(CustomerId::new())
            .paid_by(PaymentMethod::Credit)
            .line(widget.id, 2)
            .build();
        assert_eq!(sale.lines.len(), 1);
        assert_eq!(sale.payment_method, Some(PaymentMethod::Credit));

        let ret = ReturnRequestBuilder::against("AD010124-0001").line(widget.id, 1).build();
        assert_eq!(ret.lines[0].quantity, 1);
    }
}
