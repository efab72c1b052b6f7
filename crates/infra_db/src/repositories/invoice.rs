//! Invoice repository implementation
//!
//! Open means a status other than `paid` or `cancelled`; the partial unique
//! index `index_invoices_one_open_per_bl_number` allows one open invoice per
//! bill of lading, and a trigger rejects any change to `amount`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgExecutor;
use sqlx::{FromRow, PgPool};

use core_kernel::{BlNumber, Currency, CustomerId, InvoiceId};
use domain_demurrage::{Invoice, InvoiceStatus};

use crate::error::DatabaseError;

const INVOICE_COLUMNS: &str =
    "id, customer_id, bl_number, amount, currency, status, due_date, created_at, updated_at";

/// Repository for invoices
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_for_customer(
        &self,
        customer_id: i64,
        invoice_id: i64,
    ) -> Result<Option<InvoiceRow>, DatabaseError> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 AND customer_id = $2");
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(invoice_id)
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_by_id(&self, invoice_id: i64) -> Result<InvoiceRow, DatabaseError> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1");
        sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Invoice", invoice_id))
    }

    pub async fn for_bl_number(&self, bl_number: &str) -> Result<Vec<InvoiceRow>, DatabaseError> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE bl_number = $1 ORDER BY id");
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(bl_number)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Open invoices of `customer_id` due strictly before `as_of`, oldest due date first
    pub async fn overdue(&self, customer_id: i64, as_of: NaiveDate) -> Result<Vec<InvoiceRow>, DatabaseError> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE customer_id = $1 AND status NOT IN ('paid', 'cancelled') AND due_date < $2 \
             ORDER BY due_date ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(customer_id)
            .bind(as_of)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Writes status and due date; `amount` is passed through so the trigger sees any change
    pub async fn update(&self, invoice: &InvoiceUpdateRow) -> Result<InvoiceRow, DatabaseError> {
        let sql = format!(
            "UPDATE invoices SET status = $2, due_date = $3, amount = $4, updated_at = now() \
             WHERE id = $1 RETURNING {INVOICE_COLUMNS}"
        );
        sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(invoice.id)
            .bind(&invoice.status)
            .bind(invoice.due_date)
            .bind(invoice.amount)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Invoice", invoice.id))
    }

    pub async fn has_open_invoice<'e, E>(executor: E, bl_number: &str) -> Result<bool, DatabaseError>
    where
        E: PgExecutor<'e>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM invoices \
             WHERE bl_number = $1 AND status NOT IN ('paid', 'cancelled'))",
        )
        .bind(bl_number)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    /// Inserts an invoice; a second open invoice for the same bill surfaces as `DuplicateEntry`
    pub async fn insert<'e, E>(executor: E, invoice: &NewInvoiceRow) -> Result<InvoiceRow, DatabaseError>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "INSERT INTO invoices (customer_id, bl_number, amount, currency, status, due_date) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {INVOICE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(invoice.customer_id)
            .bind(&invoice.bl_number)
            .bind(invoice.amount)
            .bind(&invoice.currency)
            .bind(&invoice.status)
            .bind(invoice.due_date)
            .fetch_one(executor)
            .await?;
        Ok(row)
    }
}

/// Database row for an invoice
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub id: i64,
    pub customer_id: i64,
    pub bl_number: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    pub fn into_domain(self) -> Result<Invoice, DatabaseError> {
        let serialization = |e: &dyn std::fmt::Display| DatabaseError::SerializationError(e.to_string());

        Ok(Invoice {
            id: InvoiceId::new(self.id),
            customer_id: CustomerId::new(self.customer_id),
            bl_number: BlNumber::parse(self.bl_number).map_err(|e| serialization(&e))?,
            amount: self.amount,
            currency: self.currency.parse::<Currency>().map_err(|e| serialization(&e))?,
            status: self.status.parse::<InvoiceStatus>().map_err(|e| serialization(&e))?,
            due_date: self.due_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Insert payload for an invoice
#[derive(Debug, Clone)]
pub struct NewInvoiceRow {
    pub customer_id: i64,
    pub bl_number: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub due_date: NaiveDate,
}

/// Full set of mutable columns for an invoice update
#[derive(Debug, Clone)]
pub struct InvoiceUpdateRow {
    pub id: i64,
    pub status: String,
    pub due_date: NaiveDate,
    pub amount: Decimal,
}
