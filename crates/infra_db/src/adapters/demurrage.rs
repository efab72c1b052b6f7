//! PostgreSQL Demurrage Adapter
//!
//! Implements `DemurragePort` on top of the repositories in this crate.
//!
//! # Generation runs
//!
//! [`PostgresDemurrageAdapter::begin`] opens a `READ COMMITTED` transaction.
//! Candidate bills of lading are selected `FOR UPDATE`, so a concurrent run for
//! the same customer waits until this one commits and then sees its invoices.
//! The partial unique index on open invoices catches anything that slips past
//! the guard; its violation comes back as a `PortError::Conflict`, which the
//! generator turns into a skip after rolling back to the item's savepoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresDemurrageAdapter;
//! use domain_demurrage::{DemurragePort, InvoiceGenerator, SystemClock};
//! use std::sync::Arc;
//!
//! let port: Arc<dyn DemurragePort> = Arc::new(PostgresDemurrageAdapter::new(pool));
//! let generator = InvoiceGenerator::new(port, Arc::new(SystemClock::utc()));
//! ```

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, BlNumber, CustomerId, DomainPort, HealthCheckResult, HealthCheckable,
    InvoiceId, PortError,
};
use domain_demurrage::{
    AuditEntry, AuditRecorder, BillOfLading, ContainerType, Customer, CustomerLookup,
    DemurrageError, DemurragePort, DemurrageTransaction, Invoice, InvoiceChanges, NewAuditEntry,
    NewCustomer, NewInvoice, ValidBillOfLading,
};

use crate::error::DatabaseError;
use crate::repositories::{
    AuditRepository, BillOfLadingRepository, CustomerRepository, InvoiceRepository,
    BillOfLadingRow, InvoiceRow, InvoiceUpdateRow, NewBillOfLadingRow, NewCustomerRow,
    NewInvoiceRow,
};

const SAVEPOINT: &str = "demurrage_item";

/// PostgreSQL-backed implementation of the DemurragePort trait
///
/// # Error Handling
///
/// Database errors are translated to `PortError` variants:
/// - unique and check violations -> `Conflict` / `Validation` (item-level)
/// - connection and pool failures -> `Connection`
/// - anything else -> `Internal`
#[derive(Debug, Clone)]
pub struct PostgresDemurrageAdapter {
    pool: PgPool,
    customers: CustomerRepository,
    bills: BillOfLadingRepository,
    invoices: InvoiceRepository,
    audit: AuditRepository,
}

impl PostgresDemurrageAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            customers: CustomerRepository::new(pool.clone()),
            bills: BillOfLadingRepository::new(pool.clone()),
            invoices: InvoiceRepository::new(pool.clone()),
            audit: AuditRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PostgresDemurrageAdapter {}

#[async_trait]
impl HealthCheckable for PostgresDemurrageAdapter {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };

        HealthCheckResult {
            adapter_id: "postgres-demurrage-adapter".to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl DemurragePort for PostgresDemurrageAdapter {
    #[instrument(skip(self))]
    async fn begin(&self) -> Result<Box<dyn DemurrageTransaction>, PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;

        Ok(Box::new(PgDemurrageTransaction { tx }))
    }

    #[instrument(skip(self, lookup), fields(lookup = %lookup))]
    async fn find_customer(&self, lookup: &CustomerLookup) -> Result<Option<Customer>, PortError> {
        let row = match lookup {
            CustomerLookup::Id(id) => self.customers.find_by_id(id.value()).await?,
            CustomerLookup::Code(code) => self.customers.find_by_code(code).await?,
            CustomerLookup::ApiToken(token) => self.customers.find_by_api_token(token).await?,
        };
        Ok(row.map(|r| r.into_domain()).transpose()?)
    }

    #[instrument(skip(self, customer), fields(code = %customer.code))]
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, PortError> {
        let customer = customer.prepare().map_err(domain_to_port_error)?;
        let api_token = customer
            .api_token
            .ok_or_else(|| PortError::validation("Api token can't be blank"))?;
        let payment_terms_days = i32::try_from(customer.payment_terms_days.unwrap_or_default())
            .map_err(|_| PortError::validation("Payment terms days is too large"))?;

        let row = self
            .customers
            .create(NewCustomerRow {
                name: customer.name,
                code: customer.code,
                payment_terms_days,
                api_token: api_token.as_str().to_string(),
            })
            .await
            .map_err(|e| match e {
                DatabaseError::DuplicateEntry(message) if message.contains("customers_code_key") => {
                    PortError::conflict("Code has already been taken")
                }
                DatabaseError::DuplicateEntry(_) => PortError::conflict("Api token has already been taken"),
                other => other.into(),
            })?;

        Ok(row.into_domain()?)
    }

    #[instrument(skip(self, bill), fields(bl_number = %bill.bl_number))]
    async fn create_bill_of_lading(&self, bill: ValidBillOfLading) -> Result<BillOfLading, PortError> {
        let mut containers = [0i32; 6];
        for (slot, kind) in containers.iter_mut().zip(ContainerType::ALL) {
            *slot = i32::try_from(bill.containers.get(kind))
                .map_err(|_| PortError::validation(format!("{} is too large", kind.column())))?;
        }
        let freetime = i32::try_from(bill.free_time_days)
            .map_err(|_| PortError::validation("Freetime is too large"))?;

        let row = self
            .bills
            .create(NewBillOfLadingRow {
                customer_id: bill.customer_id.value(),
                bl_number: bill.bl_number.into_inner(),
                arrival_date: bill.arrival_date,
                freetime,
                containers,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::DuplicateEntry(_) => PortError::conflict("Bl number has already been taken"),
                DatabaseError::ForeignKeyViolation(_) => PortError::validation("Customer must exist"),
                other => other.into(),
            })?;

        Ok(row.into_domain()?)
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    async fn became_overdue_on(
        &self,
        customer_id: CustomerId,
        date: NaiveDate,
    ) -> Result<Vec<BillOfLading>, PortError> {
        let rows = self.bills.became_overdue_on(customer_id.value(), date).await?;
        bills_into_domain(rows)
    }

    #[instrument(skip(self), fields(customer_id = %customer_id, invoice_id = %invoice_id))]
    async fn find_invoice(
        &self,
        customer_id: CustomerId,
        invoice_id: InvoiceId,
    ) -> Result<Option<Invoice>, PortError> {
        let row = self
            .invoices
            .find_for_customer(customer_id.value(), invoice_id.value())
            .await?;
        Ok(row.map(InvoiceRow::into_domain).transpose()?)
    }

    async fn invoices_for_bill_of_lading(&self, bl_number: &BlNumber) -> Result<Vec<Invoice>, PortError> {
        let rows = self.invoices.for_bl_number(bl_number.as_str()).await?;
        invoices_into_domain(rows)
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    async fn overdue_invoices(
        &self,
        customer_id: CustomerId,
        as_of: NaiveDate,
    ) -> Result<Vec<Invoice>, PortError> {
        let rows = self.invoices.overdue(customer_id.value(), as_of).await?;
        invoices_into_domain(rows)
    }

    #[instrument(skip(self, changes), fields(invoice_id = %invoice_id))]
    async fn update_invoice(
        &self,
        invoice_id: InvoiceId,
        changes: InvoiceChanges,
    ) -> Result<Invoice, PortError> {
        let current = self
            .invoices
            .find_by_id(invoice_id.value())
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => PortError::not_found("Invoice", invoice_id),
                other => other.into(),
            })?
            .into_domain()?;
        let updated = changes
            .apply(&current, Utc::now())
            .map_err(domain_to_port_error)?;

        let row = self
            .invoices
            .update(&InvoiceUpdateRow {
                id: invoice_id.value(),
                status: updated.status.as_str().to_string(),
                due_date: updated.due_date,
                amount: updated.amount,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::DuplicateEntry(_) => PortError::conflict(format!(
                    "bill of lading {} already has an open invoice",
                    updated.bl_number
                )),
                other => other.into(),
            })?;

        Ok(row.into_domain()?)
    }

    async fn audit_entries_for(
        &self,
        resource_type: &str,
        resource_id: i64,
    ) -> Result<Vec<AuditEntry>, PortError> {
        let rows = self.audit.for_resource(resource_type, resource_id).await?;
        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }
}

/// A generation run's transaction
pub struct PgDemurrageTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgDemurrageTransaction {
    async fn execute(&mut self, sql: &str) -> Result<(), PortError> {
        sqlx::query(sql)
            .execute(&mut *self.tx)
            .await
            .map_err(DatabaseError::from)?;
        Ok(())
    }
}

#[async_trait]
impl AuditRecorder for PgDemurrageTransaction {
    async fn record(&mut self, entry: NewAuditEntry) -> Result<AuditEntry, PortError> {
        let row = AuditRepository::insert(&mut *self.tx, &entry).await?;
        Ok(row.into())
    }
}

#[async_trait]
impl DemurrageTransaction for PgDemurrageTransaction {
    async fn became_overdue_on(
        &mut self,
        customer_id: CustomerId,
        date: NaiveDate,
    ) -> Result<Vec<BillOfLading>, PortError> {
        let rows =
            BillOfLadingRepository::select_overdue_on(&mut *self.tx, customer_id.value(), date, true)
                .await?;
        debug!(count = rows.len(), "Locked candidate bills of lading");
        bills_into_domain(rows)
    }

    async fn has_open_invoice(&mut self, bl_number: &BlNumber) -> Result<bool, PortError> {
        Ok(InvoiceRepository::has_open_invoice(&mut *self.tx, bl_number.as_str()).await?)
    }

    async fn insert_invoice(&mut self, invoice: &NewInvoice) -> Result<Invoice, PortError> {
        let due_date = invoice
            .due_date
            .ok_or_else(|| PortError::validation("Due date can't be blank"))?;
        let amount = invoice.amount.round_to_currency();

        let row = NewInvoiceRow {
            customer_id: invoice.customer_id.value(),
            bl_number: invoice.bl_number.as_str().to_string(),
            amount: amount.amount(),
            currency: amount.currency().code().to_string(),
            status: invoice.status.as_str().to_string(),
            due_date,
        };

        InvoiceRepository::insert(&mut *self.tx, &row)
            .await
            .map_err(|e| match e {
                DatabaseError::DuplicateEntry(_) => PortError::conflict(format!(
                    "bill of lading {} already has an open invoice",
                    invoice.bl_number
                )),
                other => other.into(),
            })?
            .into_domain()
            .map_err(PortError::from)
    }

    async fn savepoint(&mut self) -> Result<(), PortError> {
        self.execute(&format!("SAVEPOINT {SAVEPOINT}")).await
    }

    async fn release_savepoint(&mut self) -> Result<(), PortError> {
        self.execute(&format!("RELEASE SAVEPOINT {SAVEPOINT}")).await
    }

    async fn rollback_to_savepoint(&mut self) -> Result<(), PortError> {
        self.execute(&format!("ROLLBACK TO SAVEPOINT {SAVEPOINT}")).await
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PortError> {
        self.tx.rollback().await.map_err(DatabaseError::from)?;
        Ok(())
    }
}

fn bills_into_domain(rows: Vec<BillOfLadingRow>) -> Result<Vec<BillOfLading>, PortError> {
    rows.into_iter()
        .map(|row| row.into_domain().map_err(PortError::from))
        .collect()
}

fn invoices_into_domain(rows: Vec<InvoiceRow>) -> Result<Vec<Invoice>, PortError> {
    rows.into_iter()
        .map(|row| row.into_domain().map_err(PortError::from))
        .collect()
}

fn domain_to_port_error(e: DemurrageError) -> PortError {
    match e {
        DemurrageError::Validation(message) | DemurrageError::InvalidInput(message) => {
            PortError::validation(message)
        }
        other => PortError::internal(other.to_string()),
    }
}
