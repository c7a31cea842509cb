//! Credit ledger reversal for returns against credit sales

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use core_kernel::{CoreError, Money};

use crate::bill::{Bill, BillType};
use crate::customer::Customer;
use crate::error::BillingError;

/// What to do when a reversal exceeds the customer's current balance
///
/// The balance may have been paid down between the sale and the return, so
/// the reversal can be larger than what is still owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditShortfallPolicy {
    /// Floor the balance at zero and log the absorbed shortfall
    #[default]
    Clamp,
    /// Fail the return with `CreditLedgerShortfall`
    Reject,
}

impl FromStr for CreditShortfallPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(CreditShortfallPolicy::Clamp),
            "reject" => Ok(CreditShortfallPolicy::Reject),
            other => Err(CoreError::configuration(format!(
                "unknown credit shortfall policy '{other}'"
            ))),
        }
    }
}

/// Outcome of a credit reversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditAdjustment {
    pub previous_balance: Money,
    pub reversed: Money,
    pub new_balance: Money,
    /// Portion of the reversal that could not be taken from the balance
    pub absorbed_shortfall: Money,
}

/// Amount of credit to reverse for a return against a credit sale
///
/// A full return reverses whatever the prior partial returns left of the
/// original total; a partial return reverses its own total. Never negative.
pub fn amount_to_reverse(
    original: &Bill,
    return_bill: &Bill,
    prior_returns: &[Bill],
) -> Result<Money, BillingError> {
    match return_bill.bill_type {
        BillType::FullReturn => {
            let already_reversed = prior_returns
                .iter()
                .filter(|bill| bill.bill_type != BillType::FullReturn)
                .map(|bill| &bill.total_amount);
            let reversed = Money::sum(already_reversed, original.currency())?;
            Ok(original.total_amount.checked_sub(&reversed)?.floor_at_zero())
        }
        _ => Ok(return_bill.total_amount.floor_at_zero()),
    }
}

/// Subtracts `amount` from the customer's balance under `policy`
pub fn reverse_credit(
    customer: &mut Customer,
    amount: Money,
    policy: CreditShortfallPolicy,
) -> Result<CreditAdjustment, BillingError> {
    let previous_balance = customer.credit_balance;
    let raw = previous_balance.checked_sub(&amount)?;
    let new_balance = raw.floor_at_zero();
    let absorbed_shortfall = new_balance.checked_sub(&raw)?;

    if absorbed_shortfall.is_positive() && policy == CreditShortfallPolicy::Reject {
        return Err(BillingError::CreditLedgerShortfall {
            customer_id: customer.id,
            shortfall: absorbed_shortfall.amount(),
        });
    }

    customer.credit_balance = new_balance;
    Ok(CreditAdjustment {
        previous_balance,
        reversed: amount,
        new_balance,
        absorbed_shortfall,
    })
}
