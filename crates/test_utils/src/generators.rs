//! Property-Based Test Generators
//!
//! Proptest strategies for billing inputs that respect domain invariants.

use core_kernel::{Currency, Money};
use domain_billing::PaymentMethod;
use proptest::prelude::*;
use rust_decimal::Decimal;

pub fn payment_method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Cash),
        Just(PaymentMethod::Online),
        Just(PaymentMethod::Credit),
        Just(PaymentMethod::Card),
    ]
}

/// A unit price together with a discount within `0..=price`
pub fn priced_discount_strategy() -> impl Strategy<Value = (Money, Money)> {
    (1i64..1_000_000i64).prop_flat_map(|price_cents| {
        (Just(price_cents), 0i64..=price_cents).prop_map(|(price, discount)| {
            (
                Money::from_minor(price, Currency::USD),
                Money::from_minor(discount, Currency::USD),
            )
        })
    })
}

/// Splits `total` units into an ordered sequence of positive return quantities
pub fn return_split_strategy(total: i32) -> impl Strategy<Value = Vec<i32>> {
    let total = total.max(1);
    prop::collection::vec(1i32..=total, 1..=total as usize).prop_map(move |parts| {
        let mut remaining = total;
        let mut split = Vec::new();
        for part in parts {
            if remaining == 0 {
                break;
            }
            let take = part.min(remaining);
            split.push(take);
            remaining -= take;
        }
        if remaining > 0 {
            split.push(remaining);
        }
        split
    })
}

/// Credit payment amounts from $0.00 to $5,000.00
pub fn credit_amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..500_000i64).prop_map(|cents| Decimal::new(cents, 2))
}
