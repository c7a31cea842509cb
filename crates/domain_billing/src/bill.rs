//! Bills and bill line items
//!
//! A bill is either a sale (`NEW`), a credit note against an earlier sale
//! (`PARTIAL_RETURN` / `FULL_RETURN`), or a payment against the customer's
//! credit balance (`CREDITS_PAYMENT`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{BillId, BillLineId, Currency, CustomerId, Money, MoneyError, ProductId};

use crate::error::BillingError;

/// Sentinel stored in `original_bill_number` for bills that reference no other bill
pub const ORIGINAL_BILL_NA: &str = "NA";

/// Kind of bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillType {
    /// A sale
    New,
    /// Credit note covering part of the remaining quantities
    PartialReturn,
    /// Credit note that completes the return of every sold unit
    FullReturn,
    /// Payment against the customer's outstanding credit
    CreditsPayment,
}

impl BillType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillType::New => "NEW",
            BillType::PartialReturn => "PARTIAL_RETURN",
            BillType::FullReturn => "FULL_RETURN",
            BillType::CreditsPayment => "CREDITS_PAYMENT",
        }
    }

    /// Returns true for credit-note kinds
    pub fn is_return(&self) -> bool {
        matches!(self, BillType::PartialReturn | BillType::FullReturn)
    }
}

/// Lifecycle status of a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Complete,
    /// Original sale whose every unit has been returned
    Cancelled,
    /// Original sale with at least one partial return
    Returned,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Complete => "COMPLETE",
            BillStatus::Cancelled => "CANCELLED",
            BillStatus::Returned => "RETURNED",
        }
    }
}

/// How a bill was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Online,
    /// Charged to the customer's credit balance
    Credit,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Online => "ONLINE",
            PaymentMethod::Credit => "CREDIT",
            PaymentMethod::Card => "CARD",
        }
    }
}

macro_rules! impl_text_enum {
    ($name:ident, $label:literal, [$($variant:ident),+ $(,)?]) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = BillingError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_uppercase();
                $(
                    if normalized == $name::$variant.as_str() {
                        return Ok($name::$variant);
                    }
                )+
                Err(BillingError::InvalidBill(format!("unknown {} '{}'", $label, s)))
            }
        }
    };
}

impl_text_enum!(BillType, "bill type", [New, PartialReturn, FullReturn, CreditsPayment]);
impl_text_enum!(BillStatus, "bill status", [Complete, Cancelled, Returned]);
impl_text_enum!(PaymentMethod, "payment method", [Cash, Online, Credit, Card]);

/// One line of a bill
///
/// Price and name are snapshots taken when the bill is issued; later catalog
/// edits do not change historical bills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillLineItem {
    pub id: BillLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub discount_per_unit: Money,
}

impl BillLineItem {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: i32,
        unit_price: Money,
        discount_per_unit: Money,
    ) -> Self {
        Self {
            id: BillLineId::new_v7(),
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            discount_per_unit,
        }
    }

    /// `quantity × (unit_price − discount_per_unit)`
    pub fn line_total(&self) -> Result<Money, MoneyError> {
        self.unit_price
            .checked_sub(&self.discount_per_unit)?
            .times(self.quantity)
    }

    /// `quantity × discount_per_unit`
    pub fn line_discount(&self) -> Result<Money, MoneyError> {
        self.discount_per_unit.times(self.quantity)
    }

    /// A credit-note line for `quantity` units priced like this line
    pub fn returned(&self, quantity: i32) -> Self {
        Self::new(
            self.product_id,
            self.product_name.clone(),
            quantity,
            self.unit_price,
            self.discount_per_unit,
        )
    }
}

/// A bill (sale, credit note or credit payment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    /// Human-facing unique number, compared case-insensitively
    pub bill_number: String,
    pub customer_id: CustomerId,
    pub bill_type: BillType,
    pub status: BillStatus,
    pub payment_method: PaymentMethod,
    pub total_amount: Money,
    pub total_discount: Money,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<BillLineItem>,
    /// Number of the sale a credit note was raised against, or [`ORIGINAL_BILL_NA`]
    pub original_bill_number: String,
}

impl Bill {
    /// Creates an empty COMPLETE bill with zero totals
    pub fn new(
        bill_number: impl Into<String>,
        customer_id: CustomerId,
        bill_type: BillType,
        payment_method: PaymentMethod,
        currency: Currency,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BillId::new_v7(),
            bill_number: bill_number.into(),
            customer_id,
            bill_type,
            status: BillStatus::Complete,
            payment_method,
            total_amount: Money::zero(currency),
            total_discount: Money::zero(currency),
            created_at,
            lines: Vec::new(),
            original_bill_number: ORIGINAL_BILL_NA.to_string(),
        }
    }

    /// Attaches lines and recomputes the totals from them
    pub fn with_lines(mut self, lines: Vec<BillLineItem>) -> Result<Self, MoneyError> {
        self.lines = lines;
        self.recalculate_totals()?;
        Ok(self)
    }

    /// Sets the amount of a line-less bill (credit payments)
    pub fn with_amount(mut self, amount: Money) -> Self {
        self.total_amount = amount;
        self.total_discount = Money::zero(amount.currency());
        self
    }

    /// Marks this bill as a credit note against `original_bill_number`
    pub fn against(mut self, original_bill_number: impl Into<String>) -> Self {
        self.original_bill_number = original_bill_number.into();
        self
    }

    pub fn currency(&self) -> Currency {
        self.total_amount.currency()
    }

    /// Number of the referenced original sale, if any
    pub fn original_bill_number(&self) -> Option<&str> {
        match self.original_bill_number.as_str() {
            ORIGINAL_BILL_NA | "" => None,
            number => Some(number),
        }
    }

    /// Returns true for bills raised against another bill
    pub fn is_credit_note(&self) -> bool {
        self.original_bill_number().is_some()
    }

    /// Case-insensitive bill number comparison
    pub fn has_number(&self, number: &str) -> bool {
        self.bill_number.eq_ignore_ascii_case(number.trim())
    }

    /// Recomputes `total_amount` and `total_discount` from the lines
    ///
    /// Line-less bills keep their amount.
    pub fn recalculate_totals(&mut self) -> Result<(), MoneyError> {
        if self.lines.is_empty() {
            return Ok(());
        }
        let currency = self.currency();
        let totals = self
            .lines
            .iter()
            .map(BillLineItem::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        let discounts = self
            .lines
            .iter()
            .map(BillLineItem::line_discount)
            .collect::<Result<Vec<_>, _>>()?;
        self.total_amount = Money::sum(&totals, currency)?;
        self.total_discount = Money::sum(&discounts, currency)?;
        Ok(())
    }

    /// Records a processed return on this original sale
    ///
    /// A full return cancels the sale. A partial return marks it RETURNED
    /// unless it already carries that mark. Returns true if anything changed.
    pub fn record_return(&mut self, processed: BillType) -> bool {
        match processed {
            BillType::FullReturn => {
                self.status = BillStatus::Cancelled;
                self.bill_type = BillType::FullReturn;
                true
            }
            BillType::PartialReturn
                if !(self.status == BillStatus::Returned
                    && self.bill_type == BillType::PartialReturn) =>
            {
                self.status = BillStatus::Returned;
                self.bill_type = BillType::PartialReturn;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    fn sale_with(lines: Vec<BillLineItem>) -> Bill {
        Bill::new("AD010124-AB12", CustomerId::new(), BillType::New, PaymentMethod::Cash, Currency::USD, Utc::now())
            .with_lines(lines)
            .unwrap()
    }

    #[test]
    fn test_line_totals() {
        let line = BillLineItem::new(ProductId::new(), "Widget", 3, usd(dec!(100)), usd(dec!(5)));
        assert_eq!(line.line_total().unwrap().amount(), dec!(285));
        assert_eq!(line.line_discount().unwrap().amount(), dec!(15));
    }

    #[test]
    fn test_bill_totals_sum_lines() {
        let bill = sale_with(vec![
            BillLineItem::new(ProductId::new(), "Widget", 3, usd(dec!(100)), usd(dec!(5))),
            BillLineItem::new(ProductId::new(), "Gadget", 2, usd(dec!(40)), usd(dec!(0))),
        ]);
        assert_eq!(bill.total_amount.amount(), dec!(365));
        assert_eq!(bill.total_discount.amount(), dec!(15));
        assert_eq!(bill.status, BillStatus::Complete);
        assert_eq!(bill.original_bill_number, ORIGINAL_BILL_NA);
        assert!(bill.original_bill_number().is_none());
    }

    #[test]
    fn test_credit_note_reference() {
        let note = Bill::new("AD020124-ZZ99", CustomerId::new(), BillType::PartialReturn, PaymentMethod::Cash, Currency::USD, Utc::now())
            .against("AD010124-AB12");
        assert!(note.is_credit_note());
        assert_eq!(note.original_bill_number(), Some("AD010124-AB12"));
    }

    #[test]
    fn test_bill_number_case_insensitive() {
        let bill = sale_with(vec![]);
        assert!(bill.has_number("ad010124-ab12"));
        assert!(!bill.has_number("AD010124-AB13"));
    }

    #[test]
    fn test_record_return_transitions() {
        let mut bill = sale_with(vec![]);
        assert!(bill.record_return(BillType::PartialReturn));
        assert_eq!(bill.status, BillStatus::Returned);
        assert!(!bill.record_return(BillType::PartialReturn));

        assert!(bill.record_return(BillType::FullReturn));
        assert_eq!(bill.status, BillStatus::Cancelled);
        assert_eq!(bill.bill_type, BillType::FullReturn);
    }

    #[test]
    fn test_enum_text_round_trip() {
        assert_eq!("partial_return".parse::<BillType>().unwrap(), BillType::PartialReturn);
        assert_eq!("CREDIT".parse::<PaymentMethod>().unwrap(), PaymentMethod::Credit);
        assert!("VOUCHER".parse::<PaymentMethod>().is_err());
        assert_eq!(
            serde_json::to_string(&BillType::CreditsPayment).unwrap(),
            "\"CREDITS_PAYMENT\""
        );
    }
}
