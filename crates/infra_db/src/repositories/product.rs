//! Product repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use core_kernel::{Currency, Money, ProductId};
use domain_billing::Product;

use crate::error::DatabaseError;

#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub currency: String,
    pub quantity_on_hand: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DatabaseError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let currency: Currency = row
            .currency
            .parse()
            .map_err(|e: core_kernel::CoreError| DatabaseError::serialization(e.to_string()))?;
        Ok(Product {
            id: ProductId::from(row.product_id),
            name: row.name,
            unit_price: Money::new(row.unit_price, currency),
            quantity_on_hand: row.quantity_on_hand,
            created_at: row.created_at,
        })
    }
}

/// Stateless access to the `products` table within a caller's transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductRepository;

impl ProductRepository {
    /// Loads a product and locks its row until the transaction ends
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: ProductId,
    ) -> Result<Option<Product>, DatabaseError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT product_id, name, unit_price, currency, quantity_on_hand, created_at
            FROM products
            WHERE product_id = $1
            FOR UPDATE
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(conn)
        .await?;

        row.map(Product::try_from).transpose()
    }

    pub async fn upsert(conn: &mut PgConnection, product: &Product) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO products (product_id, name, unit_price, currency, quantity_on_hand, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (product_id) DO UPDATE
            SET name = EXCLUDED.name,
                unit_price = EXCLUDED.unit_price,
                currency = EXCLUDED.currency,
                quantity_on_hand = EXCLUDED.quantity_on_hand
            "#,
        )
        .bind(Uuid::from(product.id))
        .bind(&product.name)
        .bind(product.unit_price.amount())
        .bind(product.unit_price.currency().code())
        .bind(product.quantity_on_hand)
        .bind(product.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }
}
