//! Catalog products and their stock counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Money, ProductId};

use crate::error::BillingError;

/// A sellable product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Money,
    /// Units on hand; never negative after a committed operation
    pub quantity_on_hand: i32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, unit_price: Money, quantity_on_hand: i32) -> Self {
        Self {
            id: ProductId::new_v7(),
            name: name.into(),
            unit_price,
            quantity_on_hand,
            created_at: Utc::now(),
        }
    }

    pub fn has_stock(&self, quantity: i32) -> bool {
        self.quantity_on_hand >= quantity
    }

    /// Takes `quantity` units out of stock for a sale
    pub fn remove_stock(&mut self, quantity: i32) -> Result<(), BillingError> {
        if !self.has_stock(quantity) {
            return Err(BillingError::InsufficientStock {
                product_id: self.id,
                product_name: self.name.clone(),
                requested: quantity,
                available: self.quantity_on_hand,
            });
        }
        self.quantity_on_hand -= quantity;
        Ok(())
    }

    /// Puts returned units back into stock
    pub fn restock(&mut self, quantity: i32) -> Result<(), BillingError> {
        self.quantity_on_hand = self.quantity_on_hand.checked_add(quantity).ok_or_else(|| {
            BillingError::DataInconsistency(format!(
                "stock counter overflow for product {}",
                self.id
            ))
        })?;
        Ok(())
    }
}
