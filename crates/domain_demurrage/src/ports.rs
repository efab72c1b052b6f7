//! Demurrage Domain Ports
//!
//! The storage boundary of the demurrage domain. [`DemurragePort`] serves
//! single reads and writes; [`DemurragePort::begin`] opens a
//! [`DemurrageTransaction`] that the invoice generator uses for one whole run.
//!
//! Adapters:
//!
//! - **PostgreSQL** (`infra_db::adapters::PostgresDemurrageAdapter`)
//! - **In-memory** ([`crate::memory::InMemoryDemurrageStore`]) for tests and demos
//!
//! # Transaction contract
//!
//! - Reads inside a transaction see its own uncommitted writes.
//! - Candidates returned by [`DemurrageTransaction::became_overdue_on`] stay
//!   protected from concurrent invoice creation until commit or rollback.
//! - Inserting a second open invoice for a bill of lading must fail with
//!   [`PortError::Conflict`] or [`PortError::Validation`], never overwrite.
//! - After a record rejection, [`DemurrageTransaction::rollback_to_savepoint`]
//!   leaves the transaction usable.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{BlNumber, CustomerId, DomainPort, HealthCheckable, InvoiceId, PortError};

use crate::audit::{AuditEntry, NewAuditEntry};
use crate::bill_of_lading::{BillOfLading, ValidBillOfLading};
use crate::customer::{Customer, NewCustomer};
use crate::error::DemurrageError;
use crate::invoice::{Invoice, InvoiceChanges, NewInvoice};

/// Ways to look up a customer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerLookup {
    /// Storage id
    Id(CustomerId),
    /// Business code, e.g. `CUST001`
    Code(String),
    /// API token presented by the customer
    ApiToken(String),
}

impl CustomerLookup {
    /// Interprets a caller-supplied identifier: digits mean an id, anything else a code
    pub fn parse_identifier(raw: &str) -> Result<Self, DemurrageError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DemurrageError::invalid_input("customer identifier is required"));
        }
        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            let id = trimmed
                .parse::<CustomerId>()
                .map_err(|e| DemurrageError::invalid_input(e.to_string()))?;
            return Ok(CustomerLookup::Id(id));
        }
        Ok(CustomerLookup::Code(trimmed.to_string()))
    }
}

impl std::fmt::Display for CustomerLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustomerLookup::Id(id) => write!(f, "id {}", id),
            CustomerLookup::Code(code) => write!(f, "code {}", code),
            CustomerLookup::ApiToken(_) => f.write_str("api token"),
        }
    }
}

/// Receives audit entries
#[async_trait]
pub trait AuditRecorder: Send {
    /// Records one entry and returns it as stored
    async fn record(&mut self, entry: NewAuditEntry) -> Result<AuditEntry, PortError>;
}

/// One storage transaction spanning an invoice generation run
#[async_trait]
pub trait DemurrageTransaction: AuditRecorder + Send {
    /// Bills of lading of `customer_id` whose due date is exactly `date`,
    /// in insertion order
    async fn became_overdue_on(
        &mut self,
        customer_id: CustomerId,
        date: NaiveDate,
    ) -> Result<Vec<BillOfLading>, PortError>;

    /// True if the bill of lading has an invoice that is neither paid nor cancelled
    async fn has_open_invoice(&mut self, bl_number: &BlNumber) -> Result<bool, PortError>;

    /// Inserts an invoice whose due date has been resolved
    async fn insert_invoice(&mut self, invoice: &NewInvoice) -> Result<Invoice, PortError>;

    /// Marks a point the transaction can roll back to
    async fn savepoint(&mut self) -> Result<(), PortError>;

    /// Keeps everything done since the last savepoint
    async fn release_savepoint(&mut self) -> Result<(), PortError>;

    /// Discards everything done since the last savepoint
    async fn rollback_to_savepoint(&mut self) -> Result<(), PortError>;

    async fn commit(self: Box<Self>) -> Result<(), PortError>;

    async fn rollback(self: Box<Self>) -> Result<(), PortError>;
}

/// The main port trait for demurrage storage
#[async_trait]
pub trait DemurragePort: DomainPort + HealthCheckable {
    /// Opens a transaction for one generation run
    async fn begin(&self) -> Result<Box<dyn DemurrageTransaction>, PortError>;

    async fn find_customer(&self, lookup: &CustomerLookup) -> Result<Option<Customer>, PortError>;

    /// Stores a customer prepared by [`NewCustomer::prepare`]
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, PortError>;

    async fn create_bill_of_lading(&self, bill: ValidBillOfLading) -> Result<BillOfLading, PortError>;

    /// Same query as the transactional variant, outside any transaction
    async fn became_overdue_on(
        &self,
        customer_id: CustomerId,
        date: NaiveDate,
    ) -> Result<Vec<BillOfLading>, PortError>;

    /// Invoice `invoice_id` if it belongs to `customer_id`
    async fn find_invoice(
        &self,
        customer_id: CustomerId,
        invoice_id: InvoiceId,
    ) -> Result<Option<Invoice>, PortError>;

    async fn invoices_for_bill_of_lading(&self, bl_number: &BlNumber) -> Result<Vec<Invoice>, PortError>;

    /// Open invoices of `customer_id` with a due date strictly before `as_of`,
    /// ordered by due date ascending
    async fn overdue_invoices(
        &self,
        customer_id: CustomerId,
        as_of: NaiveDate,
    ) -> Result<Vec<Invoice>, PortError>;

    /// Applies `changes`; any attempt to alter the amount is rejected
    async fn update_invoice(
        &self,
        invoice_id: InvoiceId,
        changes: InvoiceChanges,
    ) -> Result<Invoice, PortError>;

    async fn audit_entries_for(
        &self,
        resource_type: &str,
        resource_id: i64,
    ) -> Result<Vec<AuditEntry>, PortError>;
}
