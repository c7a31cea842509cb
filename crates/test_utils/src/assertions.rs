//! Custom Test Assertions
//!
//! Assertion helpers for money and bill views that give more meaningful
//! failure messages than plain `assert_eq!`.

use core_kernel::Money;
use domain_billing::{BillType, BillView};
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts an exact amount, ignoring trailing-zero scale differences
pub fn assert_amount(money: &Money, expected: Decimal) {
    assert_eq!(
        money.amount().normalize(),
        expected.normalize(),
        "Expected amount {}, got {}",
        expected,
        money
    );
}

pub fn assert_money_non_negative(money: &Money) {
    assert!(!money.is_negative(), "Expected non-negative money, got {}", money);
}

/// Asserts that a view's totals equal the sums over its lines
///
/// Credit payment views carry no lines and are skipped.
pub fn assert_bill_totals_consistent(view: &BillView) {
    if view.bill_type == BillType::CreditsPayment {
        assert!(view.lines.is_empty(), "Credit payment {} has lines", view.bill_number);
        return;
    }
    let total: Decimal = view.lines.iter().map(|l| l.line_total.amount()).sum();
    let discount: Decimal = view
        .lines
        .iter()
        .map(|l| l.discount_per_unit.amount() * Decimal::from(l.quantity))
        .sum();
    assert_eq!(
        view.total_amount.amount().normalize(),
        total.normalize(),
        "Bill {} total does not match its lines",
        view.bill_number
    );
    assert_eq!(
        view.total_discount.amount().normalize(),
        discount.normalize(),
        "Bill {} discount does not match its lines",
        view.bill_number
    );
}

/// Asserts that `view` is a credit note against `original_number`
pub fn assert_credit_note_of(view: &BillView, original_number: &str, bill_type: BillType) {
    assert_eq!(view.bill_type, bill_type, "Unexpected type for {}", view.bill_number);
    assert!(
        view.original_bill_number.eq_ignore_ascii_case(original_number),
        "Bill {} references {} instead of {}",
        view.bill_number,
        view.original_bill_number,
        original_number
    );
}
