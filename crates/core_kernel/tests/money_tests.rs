//! Unit tests for the Money module
//!
//! Covers creation, checked arithmetic, quantity multiplication and the
//! ordering helpers used when comparing credit balances.

use core_kernel::{Money, Currency, MoneyError};
use rust_decimal_macros::dec;
use std::cmp::Ordering;

mod creation {
    use super::*;

    #[test]
    fn test_new_rounds_to_four_decimal_places() {
        let m = Money::new(dec!(100.123456789), Currency::USD);
        assert_eq!(m.amount(), dec!(100.1235));
    }

    #[test]
    fn test_zero_creates_zero_amount() {
        let m = Money::zero(Currency::EUR);
        assert!(m.is_zero());
        assert!(!m.is_positive());
        assert!(!m.is_negative());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_checked_add_and_sub() {
        let a = Money::new(dec!(100.00), Currency::USD);
        let b = Money::new(dec!(30.25), Currency::USD);

        assert_eq!(a.checked_add(&b).unwrap().amount(), dec!(130.25));
        assert_eq!(a.checked_sub(&b).unwrap().amount(), dec!(69.75));
    }

    #[test]
    fn test_sub_can_go_negative() {
        let a = Money::new(dec!(10.00), Currency::USD);
        let b = Money::new(dec!(30.00), Currency::USD);

        let diff = a.checked_sub(&b).unwrap();
        assert!(diff.is_negative());
        assert!(diff.floor_at_zero().is_zero());
    }

    #[test]
    fn test_times_zero_quantity() {
        let unit = Money::new(dec!(9.99), Currency::USD);
        assert!(unit.times(0).unwrap().is_zero());
    }

    #[test]
    fn test_sum_of_empty_is_zero() {
        let empty: Vec<Money> = Vec::new();
        assert!(Money::sum(&empty, Currency::GBP).unwrap().is_zero());
    }

    #[test]
    fn test_sum_rejects_mixed_currencies() {
        let values = vec![
            Money::new(dec!(1), Currency::USD),
            Money::new(dec!(1), Currency::EUR),
        ];
        assert!(matches!(
            Money::sum(&values, Currency::USD),
            Err(MoneyError::CurrencyMismatch(_, _))
        ));
    }
}

mod comparison {
    use super::*;

    #[test]
    fn test_try_cmp() {
        let owed = Money::new(dec!(30.00), Currency::USD);
        let paid = Money::new(dec!(50.00), Currency::USD);

        assert_eq!(paid.try_cmp(&owed).unwrap(), Ordering::Greater);
        assert_eq!(owed.try_cmp(&owed).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_display_uses_currency_precision() {
        let m = Money::new(dec!(285), Currency::USD);
        assert_eq!(m.to_string(), "$285.00");
    }
}
