//! Bill repository
//!
//! Bills are stored as a header row in `bills` plus ordered rows in
//! `bill_lines`. Lines are written once on insert; later saves of the same
//! bill only touch the header (status, type and totals).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use std::collections::HashMap;
use uuid::Uuid;

use core_kernel::{BillId, BillLineId, Currency, CustomerId, Money, ProductId};
use domain_billing::{Bill, BillLineItem, BillQuery};

use crate::error::DatabaseError;

const BILL_COLUMNS: &str = "b.bill_id, b.bill_number, b.customer_id, b.bill_type, b.status, \
     b.payment_method, b.total_amount, b.total_discount, b.currency, \
     b.original_bill_number, b.created_at";

#[derive(Debug, Clone, FromRow)]
pub struct BillRow {
    pub bill_id: Uuid,
    pub bill_number: String,
    pub customer_id: Uuid,
    pub bill_type: String,
    pub status: String,
    pub payment_method: String,
    pub total_amount: Decimal,
    pub total_discount: Decimal,
    pub currency: String,
    pub original_bill_number: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BillLineRow {
    pub line_id: Uuid,
    pub bill_id: Uuid,
    pub line_no: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_per_unit: Decimal,
}

fn decode<T>(value: &str) -> Result<T, DatabaseError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| DatabaseError::serialization(e.to_string()))
}

fn to_bill(row: BillRow, lines: Vec<BillLineRow>) -> Result<Bill, DatabaseError> {
    let currency: Currency = decode(&row.currency)?;
    let lines = lines
        .into_iter()
        .map(|line| BillLineItem {
            id: BillLineId::from(line.line_id),
            product_id: ProductId::from(line.product_id),
            product_name: line.product_name,
            quantity: line.quantity,
            unit_price: Money::new(line.unit_price, currency),
            discount_per_unit: Money::new(line.discount_per_unit, currency),
        })
        .collect();

    Ok(Bill {
        id: BillId::from(row.bill_id),
        bill_number: row.bill_number,
        customer_id: CustomerId::from(row.customer_id),
        bill_type: decode(&row.bill_type)?,
        status: decode(&row.status)?,
        payment_method: decode(&row.payment_method)?,
        total_amount: Money::new(row.total_amount, currency),
        total_discount: Money::new(row.total_discount, currency),
        created_at: row.created_at,
        lines,
        original_bill_number: row.original_bill_number,
    })
}

/// Escapes LIKE wildcards so the term matches literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Stateless access to `bills` and `bill_lines` within a caller's transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct BillRepository;

impl BillRepository {
    /// Case-insensitive lookup by bill number, optionally locking the header row
    pub async fn find_by_number(
        conn: &mut PgConnection,
        number: &str,
        lock: bool,
    ) -> Result<Option<Bill>, DatabaseError> {
        let sql = format!(
            "SELECT {BILL_COLUMNS} FROM bills b WHERE UPPER(b.bill_number) = UPPER($1){}",
            if lock { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, BillRow>(&sql)
            .bind(number.trim())
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => {
                let mut bills = Self::attach_lines(conn, vec![row]).await?;
                Ok(bills.pop())
            }
            None => Ok(None),
        }
    }

    /// Credit notes raised against `original_number`, oldest first
    pub async fn find_returns(
        conn: &mut PgConnection,
        original_number: &str,
    ) -> Result<Vec<Bill>, DatabaseError> {
        let sql = format!(
            "SELECT {BILL_COLUMNS} FROM bills b \
             WHERE UPPER(b.original_bill_number) = UPPER($1) AND b.original_bill_number <> 'NA' \
             ORDER BY b.created_at ASC, b.bill_id ASC"
        );
        let rows = sqlx::query_as::<_, BillRow>(&sql)
            .bind(original_number.trim())
            .fetch_all(&mut *conn)
            .await?;
        Self::attach_lines(conn, rows).await
    }

    pub async fn exists(conn: &mut PgConnection, id: BillId) -> Result<bool, DatabaseError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bills WHERE bill_id = $1)")
            .bind(Uuid::from(id))
            .fetch_one(conn)
            .await?;
        Ok(exists)
    }

    /// Inserts the header and every line of a new bill
    pub async fn insert(conn: &mut PgConnection, bill: &Bill) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO bills (
                bill_id, bill_number, customer_id, bill_type, status, payment_method,
                total_amount, total_discount, currency, original_bill_number, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(Uuid::from(bill.id))
        .bind(&bill.bill_number)
        .bind(Uuid::from(bill.customer_id))
        .bind(bill.bill_type.as_str())
        .bind(bill.status.as_str())
        .bind(bill.payment_method.as_str())
        .bind(bill.total_amount.amount())
        .bind(bill.total_discount.amount())
        .bind(bill.currency().code())
        .bind(&bill.original_bill_number)
        .bind(bill.created_at)
        .execute(&mut *conn)
        .await;

        if let Err(e) = result {
            return Err(match DatabaseError::from(e) {
                DatabaseError::DuplicateEntry(_) => {
                    DatabaseError::duplicate("Bill", "bill_number", &bill.bill_number)
                }
                other => other,
            });
        }

        for (line_no, line) in bill.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO bill_lines (
                    line_id, bill_id, line_no, product_id, product_name,
                    quantity, unit_price, discount_per_unit
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::from(line.id))
            .bind(Uuid::from(bill.id))
            .bind(i32::try_from(line_no).unwrap_or(i32::MAX))
            .bind(Uuid::from(line.product_id))
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price.amount())
            .bind(line.discount_per_unit.amount())
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Rewrites the mutable header fields of an existing bill
    pub async fn update_header(conn: &mut PgConnection, bill: &Bill) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE bills
            SET bill_type = $2,
                status = $3,
                payment_method = $4,
                total_amount = $5,
                total_discount = $6
            WHERE bill_id = $1
            "#,
        )
        .bind(Uuid::from(bill.id))
        .bind(bill.bill_type.as_str())
        .bind(bill.status.as_str())
        .bind(bill.payment_method.as_str())
        .bind(bill.total_amount.amount())
        .bind(bill.total_discount.amount())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Bill", bill.id));
        }
        Ok(())
    }

    pub async fn delete(conn: &mut PgConnection, id: BillId) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM bills WHERE bill_id = $1")
            .bind(Uuid::from(id))
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bills matching the query, newest first, with the total match count
    pub async fn search(
        conn: &mut PgConnection,
        query: &BillQuery,
    ) -> Result<(Vec<Bill>, u64), DatabaseError> {
        let customer_id = query.customer_id.map(Uuid::from);
        let pattern = query.search_term().map(|t| like_pattern(&t));
        let filter = r#"
            WHERE ($1::uuid IS NULL OR b.customer_id = $1)
              AND ($2::text IS NULL
                   OR LOWER(b.bill_number) LIKE $2
                   OR LOWER(c.name) LIKE $2
                   OR LOWER(c.contact) LIKE $2
                   OR LOWER(b.bill_type) LIKE $2
                   OR LOWER(b.payment_method) LIKE $2
                   OR LOWER(b.original_bill_number) LIKE $2)
        "#;

        let count_sql = format!(
            "SELECT COUNT(*) FROM bills b JOIN customers c ON c.customer_id = b.customer_id {filter}"
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(customer_id)
            .bind(pattern.as_deref())
            .fetch_one(&mut *conn)
            .await?;

        let select_sql = format!(
            "SELECT {BILL_COLUMNS} FROM bills b JOIN customers c ON c.customer_id = b.customer_id \
             {filter} ORDER BY b.created_at DESC, b.bill_number DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, BillRow>(&select_sql)
            .bind(customer_id)
            .bind(pattern.as_deref())
            .bind(i64::from(query.page.limit))
            .bind(i64::from(query.page.offset))
            .fetch_all(&mut *conn)
            .await?;

        let bills = Self::attach_lines(conn, rows).await?;
        Ok((bills, u64::try_from(total).unwrap_or(0)))
    }

    /// Loads lines for `rows` in one query and assembles bills in row order
    async fn attach_lines(
        conn: &mut PgConnection,
        rows: Vec<BillRow>,
    ) -> Result<Vec<Bill>, DatabaseError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.bill_id).collect();
        let line_rows = sqlx::query_as::<_, BillLineRow>(
            r#"
            SELECT line_id, bill_id, line_no, product_id, product_name,
                   quantity, unit_price, discount_per_unit
            FROM bill_lines
            WHERE bill_id = ANY($1)
            ORDER BY bill_id, line_no
            "#,
        )
        .bind(&ids)
        .fetch_all(conn)
        .await?;

        let mut by_bill: HashMap<Uuid, Vec<BillLineRow>> = HashMap::new();
        for line in line_rows {
            by_bill.entry(line.bill_id).or_default().push(line);
        }

        rows.into_iter()
            .map(|row| {
                let lines = by_bill.remove(&row.bill_id).unwrap_or_default();
                to_bill(row, lines)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ad01"), "%ad01%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_row_decoding() {
        let bill_id = Uuid::new_v4();
        let row = BillRow {
            bill_id,
            bill_number: "AD010124-X1Y2".to_string(),
            customer_id: Uuid::new_v4(),
            bill_type: "PARTIAL_RETURN".to_string(),
            status: "COMPLETE".to_string(),
            payment_method: "CARD".to_string(),
            total_amount: Decimal::new(9500, 2),
            total_discount: Decimal::new(500, 2),
            currency: "USD".to_string(),
            original_bill_number: "AD010124-AAAA".to_string(),
            created_at: Utc::now(),
        };
        let line = BillLineRow {
            line_id: Uuid::new_v4(),
            bill_id,
            line_no: 0,
            product_id: Uuid::new_v4(),
            product_name: "Widget".to_string(),
            quantity: 1,
            unit_price: Decimal::new(10000, 2),
            discount_per_unit: Decimal::new(500, 2),
        };

        let bill = to_bill(row, vec![line]).unwrap();
        assert_eq!(bill.original_bill_number(), Some("AD010124-AAAA"));
        assert_eq!(bill.lines[0].line_total().unwrap().amount(), Decimal::new(9500, 2));
    }

    #[test]
    fn test_unknown_bill_type_is_rejected() {
        let row = BillRow {
            bill_id: Uuid::new_v4(),
            bill_number: "AD010124-X1Y2".to_string(),
            customer_id: Uuid::new_v4(),
            bill_type: "REFUND".to_string(),
            status: "COMPLETE".to_string(),
            payment_method: "CARD".to_string(),
            total_amount: Decimal::ZERO,
            total_discount: Decimal::ZERO,
            currency: "USD".to_string(),
            original_bill_number: "NA".to_string(),
            created_at: Utc::now(),
        };
        assert!(matches!(to_bill(row, vec![]), Err(DatabaseError::SerializationError(_))));
    }
}
