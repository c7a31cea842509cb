//! Entity validation
//!
//! The engine calls these before every store write. They are plain
//! functions so the same rules apply whichever store backs the engine.

use core_kernel::Money;

use crate::bill::{Bill, BillType, PaymentMethod};
use crate::customer::Customer;
use crate::error::BillingError;
use crate::product::Product;

pub fn require_payment_method(method: Option<PaymentMethod>) -> Result<PaymentMethod, BillingError> {
    method.ok_or_else(|| BillingError::InvalidBill("payment method is required".to_string()))
}

/// Checks a requested sale quantity against the product
///
/// Stock is checked before the sign of the quantity.
pub fn validate_sale_quantity(product: &Product, quantity: i32) -> Result<(), BillingError> {
    if !product.has_stock(quantity) {
        return Err(BillingError::InsufficientStock {
            product_id: product.id,
            product_name: product.name.clone(),
            requested: quantity,
            available: product.quantity_on_hand,
        });
    }
    if quantity <= 0 {
        return Err(BillingError::InvalidQuantity {
            product_id: product.id,
            quantity,
        });
    }
    Ok(())
}

/// A discount must lie within `0..=unit_price`
pub fn validate_discount(product: &Product, discount: &Money) -> Result<(), BillingError> {
    let invalid = || BillingError::InvalidDiscount {
        product_id: product.id,
        discount: discount.amount(),
        unit_price: product.unit_price.amount(),
    };
    if discount.is_negative() || discount.try_cmp(&product.unit_price)?.is_gt() {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_product(product: &Product) -> Result<(), BillingError> {
    if product.name.trim().is_empty() {
        return Err(BillingError::DataInconsistency(format!(
            "product {} has no name",
            product.id
        )));
    }
    if product.quantity_on_hand < 0 {
        return Err(BillingError::DataInconsistency(format!(
            "product {} would have negative stock",
            product.id
        )));
    }
    Ok(())
}

pub fn validate_customer(customer: &Customer) -> Result<(), BillingError> {
    if customer.credit_balance.is_negative() {
        return Err(BillingError::DataInconsistency(format!(
            "customer {} would have a negative credit balance",
            customer.id
        )));
    }
    Ok(())
}

/// Structural checks on a bill about to be written
pub fn validate_bill(bill: &Bill) -> Result<(), BillingError> {
    if bill.bill_number.trim().is_empty() {
        return Err(BillingError::InvalidBill("bill number is empty".to_string()));
    }
    match bill.bill_type {
        BillType::CreditsPayment => {
            if !bill.lines.is_empty() {
                return Err(BillingError::InvalidBill(
                    "credit payment bills carry no lines".to_string(),
                ));
            }
            if bill.total_amount.is_negative() {
                return Err(BillingError::InvalidBill(
                    "credit payment amount is negative".to_string(),
                ));
            }
        }
        _ => {
            if bill.lines.is_empty() {
                return Err(BillingError::EmptyBill);
            }
            if let Some(line) = bill.lines.iter().find(|l| l.quantity <= 0) {
                return Err(BillingError::InvalidQuantity {
                    product_id: line.product_id,
                    quantity: line.quantity,
                });
            }
            let mut recomputed = bill.clone();
            recomputed.recalculate_totals()?;
            if recomputed.total_amount != bill.total_amount
                || recomputed.total_discount != bill.total_discount
            {
                return Err(BillingError::InvalidBill(format!(
                    "totals of bill {} do not match its lines",
                    bill.bill_number
                )));
            }
        }
    }
    Ok(())
}

/// A credit payment must lie within `0..=balance`
pub fn validate_credit_payment(customer: &Customer, amount: &Money) -> Result<(), BillingError> {
    if amount.is_negative() || amount.try_cmp(&customer.credit_balance)?.is_gt() {
        return Err(BillingError::InvalidCreditAmount {
            amount: amount.amount(),
            balance: customer.credit_balance.amount(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bill::BillLineItem;
    use chrono::Utc;
    use core_kernel::{Currency, CustomerId};
    use rust_decimal_macros::dec;

    fn usd(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    #[test]
    fn test_stock_checked_before_sign() {
        let product = Product::new("Widget", usd(dec!(10)), 5);
        assert!(matches!(
            validate_sale_quantity(&product, 6),
            Err(BillingError::InsufficientStock { .. })
        ));
        assert!(matches!(
            validate_sale_quantity(&product, 0),
            Err(BillingError::InvalidQuantity { quantity: 0, .. })
        ));
        assert!(validate_sale_quantity(&product, 5).is_ok());
    }

    #[test]
    fn test_discount_bounds() {
        let product = Product::new("Widget", usd(dec!(10)), 5);
        assert!(validate_discount(&product, &usd(dec!(0))).is_ok());
        assert!(validate_discount(&product, &usd(dec!(10))).is_ok());
        assert!(validate_discount(&product, &usd(dec!(10.01))).is_err());
        assert!(validate_discount(&product, &usd(dec!(-1))).is_err());
    }

    #[test]
    fn test_bill_totals_must_match_lines() {
        let line = BillLineItem::new(product_id(), "Widget", 2, usd(dec!(10)), usd(dec!(0)));
        let mut bill = Bill::new("AD010124-AAAA", CustomerId::new(), BillType::New, PaymentMethod::Cash, Currency::USD, Utc::now())
            .with_lines(vec![line])
            .unwrap();
        assert!(validate_bill(&bill).is_ok());

        bill.total_amount = usd(dec!(1));
        assert!(matches!(validate_bill(&bill), Err(BillingError::InvalidBill(_))));
    }

    #[test]
    fn test_credit_payment_bill_has_no_lines() {
        let bill = Bill::new("AD010124-AAAA", CustomerId::new(), BillType::CreditsPayment, PaymentMethod::Cash, Currency::USD, Utc::now())
            .with_amount(usd(dec!(50)));
        assert!(validate_bill(&bill).is_ok());
    }

    #[test]
    fn test_credit_payment_bounds() {
        let customer = Customer::new("Alice Doe", "555-0100", Currency::USD)
            .with_credit_balance(usd(dec!(100)));
        assert!(validate_credit_payment(&customer, &usd(dec!(100))).is_ok());
        assert!(validate_credit_payment(&customer, &usd(dec!(0))).is_ok());
        assert!(validate_credit_payment(&customer, &usd(dec!(100.01))).is_err());
        assert!(validate_credit_payment(&customer, &usd(dec!(-5))).is_err());
    }

    fn product_id() -> core_kernel::ProductId {
        core_kernel::ProductId::new()
    }
}
