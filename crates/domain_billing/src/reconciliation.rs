//! Return reconciliation
//!
//! Derives, per product, how many units of an original sale are still
//! returnable given every credit note already raised against it, and decides
//! whether a new return completes the full return of the sale.

use std::collections::BTreeMap;

use core_kernel::ProductId;

use crate::bill::{Bill, BillLineItem, BillType};
use crate::error::BillingError;
use crate::request::ReturnLine;

/// Units per product; sums are widened to avoid overflow across many bills
pub type QuantityMap = BTreeMap<ProductId, i64>;

pub fn quantities_by_product<'a, I>(lines: I) -> QuantityMap
where
    I: IntoIterator<Item = &'a BillLineItem>,
{
    let mut map = QuantityMap::new();
    for line in lines {
        *map.entry(line.product_id).or_insert(0) += i64::from(line.quantity);
    }
    map
}

/// Returnable state of one original sale
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnReconciliation {
    bill_number: String,
    original: QuantityMap,
    already_returned: QuantityMap,
    remaining: QuantityMap,
}

impl ReturnReconciliation {
    /// Builds the reconciliation from the original sale and its prior credit notes
    ///
    /// Fails with `DataInconsistency` if the history returns more than was
    /// sold or returns a product the sale never contained, and with
    /// `NothingLeftToReturn` if every unit is already back.
    pub fn compute(original: &Bill, prior_returns: &[Bill]) -> Result<Self, BillingError> {
        let sold = quantities_by_product(&original.lines);
        let already_returned =
            quantities_by_product(prior_returns.iter().flat_map(|bill| bill.lines.iter()));

        if let Some(stray) = already_returned.keys().find(|id| !sold.contains_key(id)) {
            return Err(BillingError::DataInconsistency(format!(
                "return history of bill {} contains product {} that was never sold on it",
                original.bill_number, stray
            )));
        }

        let mut remaining = QuantityMap::new();
        for (product_id, sold_qty) in &sold {
            let returned = already_returned.get(product_id).copied().unwrap_or(0);
            let left = sold_qty - returned;
            if left < 0 {
                return Err(BillingError::DataInconsistency(format!(
                    "product {} on bill {} returned {} of {} sold",
                    product_id, original.bill_number, returned, sold_qty
                )));
            }
            if left > 0 {
                remaining.insert(*product_id, left);
            }
        }

        if remaining.is_empty() {
            return Err(BillingError::NothingLeftToReturn(original.bill_number.clone()));
        }

        Ok(Self {
            bill_number: original.bill_number.clone(),
            original: sold,
            already_returned,
            remaining,
        })
    }

    pub fn remaining(&self) -> &QuantityMap {
        &self.remaining
    }

    pub fn remaining_for(&self, product_id: &ProductId) -> i64 {
        self.remaining.get(product_id).copied().unwrap_or(0)
    }

    pub fn already_returned(&self) -> &QuantityMap {
        &self.already_returned
    }

    /// Validates requested lines and returns them aggregated per product
    ///
    /// Each line must name a product with units remaining, carry a positive
    /// quantity, and fit within the remaining count. Lines repeating a
    /// product are then summed and checked again as a whole.
    pub fn validate_request(&self, lines: &[ReturnLine]) -> Result<QuantityMap, BillingError> {
        let mut requested = QuantityMap::new();
        for line in lines {
            let Some(&left) = self.remaining.get(&line.product_id) else {
                return Err(BillingError::ProductNotReturnable(line.product_id));
            };
            if line.quantity <= 0 {
                return Err(BillingError::InvalidQuantity {
                    product_id: line.product_id,
                    quantity: line.quantity,
                });
            }
            let total = requested.entry(line.product_id).or_insert(0);
            *total += i64::from(line.quantity);
            if *total > left {
                return Err(BillingError::ExceedsRemainingQuantity {
                    product_id: line.product_id,
                    requested: *total,
                    remaining: left,
                });
            }
        }
        Ok(requested)
    }

    /// FULL_RETURN iff prior returns plus this request equal the sale exactly
    pub fn classify(&self, requested: &QuantityMap) -> BillType {
        let mut cumulative = self.already_returned.clone();
        for (product_id, qty) in requested {
            *cumulative.entry(*product_id).or_insert(0) += qty;
        }
        if cumulative == self.original {
            BillType::FullReturn
        } else {
            BillType::PartialReturn
        }
    }

    /// Prices a validated request against the original sale's lines
    ///
    /// A product sold on several lines is drawn from those lines in sale
    /// order. Units credited by earlier returns consume the earliest lines
    /// first, so every unit is credited at the price it was sold for and the
    /// credit notes of a fully returned sale add up to the sale total.
    pub fn allocate_lines(
        &self,
        original: &Bill,
        lines: &[ReturnLine],
    ) -> Result<Vec<BillLineItem>, BillingError> {
        let mut consumed = self.already_returned.clone();
        let mut allocated = Vec::with_capacity(lines.len());

        for line in lines {
            let mut wanted = line.quantity;
            let mut skip = consumed.get(&line.product_id).copied().unwrap_or(0);

            for source in original.lines.iter().filter(|l| l.product_id == line.product_id) {
                if wanted == 0 {
                    break;
                }
                let available = i64::from(source.quantity) - skip;
                if available <= 0 {
                    skip -= i64::from(source.quantity);
                    continue;
                }
                skip = 0;
                let take = i32::try_from(available.min(i64::from(wanted))).unwrap_or(wanted);
                allocated.push(source.returned(take));
                wanted -= take;
            }

            if wanted > 0 {
                return Err(BillingError::ExceedsRemainingQuantity {
                    product_id: line.product_id,
                    requested: i64::from(line.quantity),
                    remaining: i64::from(line.quantity - wanted),
                });
            }
            *consumed.entry(line.product_id).or_insert(0) += i64::from(line.quantity);
        }
        Ok(allocated)
    }

    pub fn bill_number(&self) -> &str {
        &self.bill_number
    }
}
