//! Customers and their running credit balance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, CustomerId, Money, MoneyError};

/// A customer with a non-negative outstanding credit balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Contact number; unique per customer
    pub contact: String,
    pub email: Option<String>,
    /// Amount the customer owes from credit sales
    pub credit_balance: Money,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(name: impl Into<String>, contact: impl Into<String>, currency: Currency) -> Self {
        Self {
            id: CustomerId::new_v7(),
            name: name.into(),
            contact: contact.into(),
            email: None,
            credit_balance: Money::zero(currency),
            created_at: Utc::now(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_credit_balance(mut self, balance: Money) -> Self {
        self.credit_balance = balance;
        self
    }

    /// Adds a credit sale to the balance
    pub fn charge(&mut self, amount: &Money) -> Result<(), MoneyError> {
        self.credit_balance = self.credit_balance.checked_add(amount)?;
        Ok(())
    }

    /// Pays down the balance; callers validate the amount first
    pub fn settle(&mut self, amount: &Money) -> Result<(), MoneyError> {
        self.credit_balance = self.credit_balance.checked_sub(amount)?;
        Ok(())
    }

    pub fn has_credit(&self) -> bool {
        self.credit_balance.is_positive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_charge_and_settle() {
        let mut customer = Customer::new("Alice Doe", "555-0100", Currency::USD);
        assert!(!customer.has_credit());

        customer.charge(&Money::new(dec!(285), Currency::USD)).unwrap();
        customer.settle(&Money::new(dec!(85), Currency::USD)).unwrap();
        assert_eq!(customer.credit_balance.amount(), dec!(200));
        assert!(customer.has_credit());
    }

    #[test]
    fn test_charge_rejects_other_currency() {
        let mut customer = Customer::new("Alice Doe", "555-0100", Currency::USD);
        assert!(customer.charge(&Money::new(dec!(1), Currency::EUR)).is_err());
    }
}
