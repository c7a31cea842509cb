//! Customer repository and credit ledger queries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use core_kernel::{Currency, CustomerId, Money, PageRequest};
use domain_billing::{CreditSummary, Customer};

use crate::error::DatabaseError;

const CUSTOMER_COLUMNS: &str =
    "customer_id, name, contact, email, credit_balance, currency, created_at";

#[derive(Debug, Clone, FromRow)]
pub struct CustomerRow {
    pub customer_id: Uuid,
    pub name: String,
    pub contact: String,
    pub email: Option<String>,
    pub credit_balance: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = DatabaseError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let currency: Currency = row
            .currency
            .parse()
            .map_err(|e: core_kernel::CoreError| DatabaseError::serialization(e.to_string()))?;
        Ok(Customer {
            id: CustomerId::from(row.customer_id),
            name: row.name,
            contact: row.contact,
            email: row.email,
            credit_balance: Money::new(row.credit_balance, currency),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CreditSummaryRow {
    customers: i64,
    total: Decimal,
    average: Decimal,
}

/// Stateless access to the `customers` table within a caller's transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerRepository;

impl CustomerRepository {
    /// Loads a customer, optionally locking its row until the transaction ends
    pub async fn find(
        conn: &mut PgConnection,
        id: CustomerId,
        lock: bool,
    ) -> Result<Option<Customer>, DatabaseError> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE customer_id = $1{}",
            if lock { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(conn)
            .await?;
        row.map(Customer::try_from).transpose()
    }

    pub async fn find_by_contact(
        conn: &mut PgConnection,
        contact: &str,
    ) -> Result<Option<Customer>, DatabaseError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE contact = $1");
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(contact.trim())
            .fetch_optional(conn)
            .await?;
        row.map(Customer::try_from).transpose()
    }

    pub async fn upsert(conn: &mut PgConnection, customer: &Customer) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO customers (customer_id, name, contact, email, credit_balance, currency, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (customer_id) DO UPDATE
            SET name = EXCLUDED.name,
                contact = EXCLUDED.contact,
                email = EXCLUDED.email,
                credit_balance = EXCLUDED.credit_balance,
                currency = EXCLUDED.currency
            "#,
        )
        .bind(Uuid::from(customer.id))
        .bind(&customer.name)
        .bind(&customer.contact)
        .bind(&customer.email)
        .bind(customer.credit_balance.amount())
        .bind(customer.credit_balance.currency().code())
        .bind(customer.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Count, sum and average of balances above zero
    pub async fn credit_summary(conn: &mut PgConnection) -> Result<CreditSummary, DatabaseError> {
        let row = sqlx::query_as::<_, CreditSummaryRow>(
            r#"
            SELECT COUNT(*) AS customers,
                   COALESCE(SUM(credit_balance), 0) AS total,
                   COALESCE(ROUND(AVG(credit_balance), 4), 0) AS average
            FROM customers
            WHERE credit_balance > 0
            "#,
        )
        .fetch_one(conn)
        .await?;

        Ok(CreditSummary {
            customers_with_credit: u64::try_from(row.customers).unwrap_or(0),
            total_credit: row.total,
            average_credit: row.average,
        })
    }

    /// Customers owing credit, largest balance first, with the total match count
    pub async fn with_credit(
        conn: &mut PgConnection,
        page: PageRequest,
    ) -> Result<(Vec<Customer>, u64), DatabaseError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE credit_balance > 0")
                .fetch_one(&mut *conn)
                .await?;

        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE credit_balance > 0 \
             ORDER BY credit_balance DESC, name ASC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(conn)
            .await?;

        let customers = rows
            .into_iter()
            .map(Customer::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((customers, u64::try_from(total).unwrap_or(0)))
    }
}
