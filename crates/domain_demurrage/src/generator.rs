//! Invoice generation
//!
//! One run covers one customer and one date. The candidates are the bills of
//! lading that became overdue on exactly that date; each is either invoiced or
//! skipped with a reason. The run shares one storage transaction:
//!
//! - a bill with an open invoice, no containers, or a rejected record is
//!   skipped and the run continues
//! - any other storage failure rolls back every invoice of the run
//!
//! Each item is written under its own savepoint, so a rejected insert or
//! audit entry never leaves half an item behind.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use core_kernel::{Currency, PortError, RunId};

use crate::audit::NewAuditEntry;
use crate::bill_of_lading::BillOfLading;
use crate::clock::Clock;
use crate::customer::Customer;
use crate::error::DemurrageError;
use crate::invoice::{Invoice, NewInvoice};
use crate::ports::{CustomerLookup, DemurragePort, DemurrageTransaction};
use crate::summary::{GenerationSummary, SkippedBillOfLading};

/// Why a candidate did not get an invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The bill of lading already carries an open invoice
    OpenInvoiceExists,
    /// All container counts are zero
    ZeroContainers,
    /// The invoice or its audit entry failed validation
    Rejected(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::OpenInvoiceExists => f.write_str("Open invoice already exists"),
            SkipReason::ZeroContainers => f.write_str("Bill of lading currently have zero containers"),
            SkipReason::Rejected(message) => f.write_str(message),
        }
    }
}

/// Input of a generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub customer: CustomerLookup,
    /// Defaults to yesterday when absent
    pub date: Option<NaiveDate>,
}

impl GenerationRequest {
    pub fn new(customer: CustomerLookup) -> Self {
        Self { customer, date: None }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Builds a request from raw caller input
    ///
    /// The customer is required. The date, when given and not blank, must be
    /// `YYYY-MM-DD`.
    pub fn parse(customer: Option<&str>, date: Option<&str>) -> Result<Self, DemurrageError> {
        let customer = customer
            .ok_or_else(|| DemurrageError::invalid_input("customer identifier is required"))
            .and_then(CustomerLookup::parse_identifier)?;

        let date = match date.map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                DemurrageError::invalid_input(format!("invalid date '{}', expected YYYY-MM-DD", raw))
            })?),
            None => None,
        };

        Ok(Self { customer, date })
    }
}

enum ItemOutcome {
    Created(Invoice),
    Skipped(SkipReason),
}

/// Daily batch that turns newly overdue bills of lading into invoices
#[derive(Clone)]
pub struct InvoiceGenerator {
    port: Arc<dyn DemurragePort>,
    clock: Arc<dyn Clock>,
}

impl InvoiceGenerator {
    pub fn new(port: Arc<dyn DemurragePort>, clock: Arc<dyn Clock>) -> Self {
        Self { port, clock }
    }

    /// Resolves the customer and date, then runs [`Self::generate_for`]
    ///
    /// # Errors
    ///
    /// - [`DemurrageError::CustomerNotFound`] if the lookup matches nobody
    /// - [`DemurrageError::Storage`] if the run was rolled back
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationSummary, DemurrageError> {
        let customer = self
            .port
            .find_customer(&request.customer)
            .await
            .map_err(DemurrageError::Storage)?
            .ok_or_else(|| DemurrageError::CustomerNotFound(request.customer.to_string()))?;

        let date = request.date.unwrap_or_else(|| self.clock.yesterday());
        self.generate_for(&customer, date).await
    }

    /// Generates invoices for `customer`'s bills of lading that became overdue on `date`
    ///
    /// Amounts are priced as of the clock's today, which for a past `date`
    /// includes the days elapsed since.
    #[instrument(
        skip(self, customer),
        fields(run_id = %RunId::new_v7(), customer = %customer.code)
    )]
    pub async fn generate_for(
        &self,
        customer: &Customer,
        date: NaiveDate,
    ) -> Result<GenerationSummary, DemurrageError> {
        let today = self.clock.today();
        let mut tx = self.port.begin().await.map_err(DemurrageError::Storage)?;

        let outcome = match run(tx.as_mut(), customer, date, today).await {
            Ok((created, skipped)) => GenerationSummary::assemble(created, skipped, Currency::USD),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(summary) => {
                tx.commit().await.map_err(DemurrageError::Storage)?;
                info!(
                    created = summary.created_count,
                    skipped = summary.skipped_count,
                    total_amount = %summary.total_amount,
                    "Invoice generation completed"
                );
                Ok(summary)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed run also failed");
                }
                warn!(error = %err, "Invoice generation rolled back");
                Err(err)
            }
        }
    }
}

async fn run(
    tx: &mut dyn DemurrageTransaction,
    customer: &Customer,
    date: NaiveDate,
    today: NaiveDate,
) -> Result<(Vec<Invoice>, Vec<SkippedBillOfLading>), DemurrageError> {
    let candidates = tx
        .became_overdue_on(customer.id, date)
        .await
        .map_err(DemurrageError::Storage)?;
    debug!(candidates = candidates.len(), "Selected bills of lading");

    let mut created = Vec::new();
    let mut skipped = Vec::new();

    for bill in &candidates {
        match process(tx, customer, bill, today).await? {
            ItemOutcome::Created(invoice) => {
                debug!(bl_number = %bill.bl_number, invoice_id = %invoice.id, amount = %invoice.amount, "Invoice created");
                created.push(invoice);
            }
            ItemOutcome::Skipped(reason) => {
                debug!(bl_number = %bill.bl_number, %reason, "Bill of lading skipped");
                skipped.push(SkippedBillOfLading {
                    bl_number: bill.bl_number.clone(),
                    reason: reason.to_string(),
                });
            }
        }
    }

    Ok((created, skipped))
}

async fn process(
    tx: &mut dyn DemurrageTransaction,
    customer: &Customer,
    bill: &BillOfLading,
    today: NaiveDate,
) -> Result<ItemOutcome, DemurrageError> {
    if tx
        .has_open_invoice(&bill.bl_number)
        .await
        .map_err(DemurrageError::Storage)?
    {
        return Ok(ItemOutcome::Skipped(SkipReason::OpenInvoiceExists));
    }
    if bill.total_containers() == 0 {
        return Ok(ItemOutcome::Skipped(SkipReason::ZeroContainers));
    }

    let invoice = NewInvoice::for_bill_of_lading(customer, bill, today);
    if let Err(err) = invoice.validate() {
        return Ok(ItemOutcome::Skipped(SkipReason::Rejected(rejection_message(err))));
    }

    tx.savepoint().await.map_err(DemurrageError::Storage)?;
    match issue_in(tx, &invoice).await {
        Ok(created) => {
            tx.release_savepoint().await.map_err(DemurrageError::Storage)?;
            Ok(ItemOutcome::Created(created))
        }
        Err(err) if err.is_record_rejection() => {
            tx.rollback_to_savepoint().await.map_err(DemurrageError::Storage)?;
            Ok(ItemOutcome::Skipped(SkipReason::Rejected(err.to_string())))
        }
        Err(err) => Err(DemurrageError::Storage(err)),
    }
}

/// Inserts the invoice and its `invoice_created` audit entry
async fn issue_in(tx: &mut dyn DemurrageTransaction, invoice: &NewInvoice) -> Result<Invoice, PortError> {
    let created = tx.insert_invoice(invoice).await?;

    let entry = NewAuditEntry::invoice_created(&created);
    entry
        .validate()
        .map_err(|err| PortError::validation(rejection_message(err)))?;
    tx.record(entry).await?;

    Ok(created)
}

fn rejection_message(err: DemurrageError) -> String {
    match err {
        DemurrageError::Validation(message) => message,
        other => other.to_string(),
    }
}

/// Creates a single invoice together with its audit entry, outside a batch run
///
/// The invoice must carry a due date.
pub async fn issue_invoice(port: &dyn DemurragePort, invoice: NewInvoice) -> Result<Invoice, DemurrageError> {
    invoice.validate()?;

    let mut tx = port.begin().await.map_err(DemurrageError::Storage)?;
    match issue_in(tx.as_mut(), &invoice).await {
        Ok(created) => {
            tx.commit().await.map_err(DemurrageError::Storage)?;
            Ok(created)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err.into())
        }
    }
}
