//! In-memory demurrage store
//!
//! A [`DemurragePort`] backed by plain vectors, used by the engine and API
//! tests. A transaction holds the store lock for its whole life and works on
//! a copy of the state, so concurrent runs are serialized and an uncommitted
//! run leaves no trace.
//!
//! [`Fault`]s can be injected to exercise the failure paths of the generator.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::{
    AdapterHealth, AuditEntryId, BillOfLadingId, BlNumber, CustomerId, DomainPort,
    HealthCheckResult, HealthCheckable, InvoiceId, PortError,
};

use crate::audit::{AuditEntry, NewAuditEntry};
use crate::bill_of_lading::{BillOfLading, ValidBillOfLading};
use crate::customer::{Customer, NewCustomer};
use crate::error::DemurrageError;
use crate::invoice::{Invoice, InvoiceChanges, NewInvoice};
use crate::ports::{AuditRecorder, CustomerLookup, DemurragePort, DemurrageTransaction};

/// Failures the store can be told to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Inserting an invoice for this bill of lading fails with a connection error
    StorageOutageOn(BlNumber),
    /// Audit entries about this bill of lading are rejected as invalid
    RejectAuditFor(BlNumber),
    /// Every operation fails with a connection error
    Unavailable,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_customer_id: i64,
    last_bill_id: i64,
    last_invoice_id: i64,
    last_audit_id: i64,
    customers: Vec<Customer>,
    bills: Vec<BillOfLading>,
    invoices: Vec<Invoice>,
    audit: Vec<AuditEntry>,
    faults: Vec<Fault>,
}

fn unavailable() -> PortError {
    PortError::connection("in-memory store unavailable")
}

fn to_port_error(err: DemurrageError) -> PortError {
    match err {
        DemurrageError::Validation(message) | DemurrageError::InvalidInput(message) => {
            PortError::validation(message)
        }
        other => PortError::internal(other.to_string()),
    }
}

impl MemoryState {
    fn check_available(&self) -> Result<(), PortError> {
        if self.faults.contains(&Fault::Unavailable) {
            return Err(unavailable());
        }
        Ok(())
    }

    fn find_customer(&self, lookup: &CustomerLookup) -> Option<Customer> {
        self.customers
            .iter()
            .find(|c| match lookup {
                CustomerLookup::Id(id) => c.id == *id,
                CustomerLookup::Code(code) => c.code == *code,
                CustomerLookup::ApiToken(token) => c.api_token.as_str() == token,
            })
            .cloned()
    }

    fn create_customer(&mut self, customer: NewCustomer) -> Result<Customer, PortError> {
        let customer = customer.prepare().map_err(to_port_error)?;
        let api_token = customer
            .api_token
            .ok_or_else(|| PortError::validation("Api token can't be blank"))?;

        if self.customers.iter().any(|c| c.code == customer.code) {
            return Err(PortError::conflict("Code has already been taken"));
        }
        if self.customers.iter().any(|c| c.api_token == api_token) {
            return Err(PortError::conflict("Api token has already been taken"));
        }

        self.last_customer_id += 1;
        let stored = Customer {
            id: CustomerId::new(self.last_customer_id),
            name: customer.name,
            code: customer.code,
            payment_terms_days: customer.payment_terms_days.unwrap_or_default(),
            api_token,
            created_at: Utc::now(),
        };
        self.customers.push(stored.clone());
        Ok(stored)
    }

    fn create_bill_of_lading(&mut self, bill: ValidBillOfLading) -> Result<BillOfLading, PortError> {
        if !self.customers.iter().any(|c| c.id == bill.customer_id) {
            return Err(PortError::validation("Customer must exist"));
        }
        if self.bills.iter().any(|b| b.bl_number == bill.bl_number) {
            return Err(PortError::conflict("Bl number has already been taken"));
        }

        self.last_bill_id += 1;
        let stored = BillOfLading {
            id: BillOfLadingId::new(self.last_bill_id),
            bl_number: bill.bl_number,
            customer_id: bill.customer_id,
            arrival_date: bill.arrival_date,
            free_time_days: bill.free_time_days,
            containers: bill.containers,
            created_at: Utc::now(),
        };
        self.bills.push(stored.clone());
        Ok(stored)
    }

    fn became_overdue_on(&self, customer_id: CustomerId, date: NaiveDate) -> Vec<BillOfLading> {
        crate::bill_of_lading::became_overdue_on(
            self.bills.iter().filter(|b| b.customer_id == customer_id),
            date,
        )
    }

    fn has_open_invoice(&self, bl_number: &BlNumber) -> bool {
        self.invoices
            .iter()
            .any(|i| i.bl_number == *bl_number && i.is_open())
    }

    fn insert_invoice(&mut self, invoice: &NewInvoice) -> Result<Invoice, PortError> {
        if self.faults.contains(&Fault::StorageOutageOn(invoice.bl_number.clone())) {
            return Err(PortError::connection(format!(
                "connection lost while inserting invoice for {}",
                invoice.bl_number
            )));
        }
        invoice.validate().map_err(to_port_error)?;
        let due_date = invoice
            .due_date
            .ok_or_else(|| PortError::validation("Due date can't be blank"))?;

        if !self.customers.iter().any(|c| c.id == invoice.customer_id) {
            return Err(PortError::validation("Customer must exist"));
        }
        if invoice.status.is_open() && self.has_open_invoice(&invoice.bl_number) {
            return Err(PortError::conflict(format!(
                "bill of lading {} already has an open invoice",
                invoice.bl_number
            )));
        }

        self.last_invoice_id += 1;
        let now = Utc::now();
        let amount = invoice.amount.round_to_currency();
        let stored = Invoice {
            id: InvoiceId::new(self.last_invoice_id),
            customer_id: invoice.customer_id,
            bl_number: invoice.bl_number.clone(),
            amount: amount.amount(),
            currency: amount.currency(),
            status: invoice.status,
            due_date,
            created_at: now,
            updated_at: now,
        };
        self.invoices.push(stored.clone());
        Ok(stored)
    }

    fn record(&mut self, entry: NewAuditEntry) -> Result<AuditEntry, PortError> {
        let rejected = self.faults.iter().any(|f| match f {
            Fault::RejectAuditFor(bl) => entry.metadata["bl_number"] == bl.as_str(),
            _ => false,
        });
        if rejected {
            return Err(PortError::validation("Audit entry rejected"));
        }
        entry.validate().map_err(to_port_error)?;

        self.last_audit_id += 1;
        let stored = AuditEntry {
            id: AuditEntryId::new(self.last_audit_id),
            event_type: entry.event_type,
            actor: entry.actor,
            resource_type: entry.resource_type,
            resource_id: entry.resource_id,
            metadata: entry.metadata,
            created_at: Utc::now(),
        };
        self.audit.push(stored.clone());
        Ok(stored)
    }
}

/// In-memory implementation of [`DemurragePort`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryDemurrageStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryDemurrageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn inject_fault(&self, fault: Fault) {
        self.state.lock().await.faults.push(fault);
    }

    pub async fn clear_faults(&self) {
        self.state.lock().await.faults.clear();
    }

    /// Number of stored invoices, regardless of status
    pub async fn invoice_count(&self) -> usize {
        self.state.lock().await.invoices.len()
    }

    /// Every stored audit entry, oldest first
    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.state.lock().await.audit.clone()
    }
}

impl DomainPort for InMemoryDemurrageStore {}

#[async_trait]
impl HealthCheckable for InMemoryDemurrageStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let state = self.state.lock().await;
        let (status, message) = match state.check_available() {
            Ok(()) => (AdapterHealth::Healthy, None),
            Err(err) => (AdapterHealth::Unhealthy, Some(err.to_string())),
        };

        HealthCheckResult {
            adapter_id: "in_memory".to_string(),
            status,
            latency_ms: start.elapsed().as_millis() as u64,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl DemurragePort for InMemoryDemurrageStore {
    async fn begin(&self) -> Result<Box<dyn DemurrageTransaction>, PortError> {
        let guard = self.state.clone().lock_owned().await;
        guard.check_available()?;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            savepoint: None,
        }))
    }

    async fn find_customer(&self, lookup: &CustomerLookup) -> Result<Option<Customer>, PortError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state.find_customer(lookup))
    }

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, PortError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        state.create_customer(customer)
    }

    async fn create_bill_of_lading(&self, bill: ValidBillOfLading) -> Result<BillOfLading, PortError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        state.create_bill_of_lading(bill)
    }

    async fn became_overdue_on(
        &self,
        customer_id: CustomerId,
        date: NaiveDate,
    ) -> Result<Vec<BillOfLading>, PortError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state.became_overdue_on(customer_id, date))
    }

    async fn find_invoice(
        &self,
        customer_id: CustomerId,
        invoice_id: InvoiceId,
    ) -> Result<Option<Invoice>, PortError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state
            .invoices
            .iter()
            .find(|i| i.id == invoice_id && i.customer_id == customer_id)
            .cloned())
    }

    async fn invoices_for_bill_of_lading(&self, bl_number: &BlNumber) -> Result<Vec<Invoice>, PortError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state
            .invoices
            .iter()
            .filter(|i| i.bl_number == *bl_number)
            .cloned()
            .collect())
    }

    async fn overdue_invoices(
        &self,
        customer_id: CustomerId,
        as_of: NaiveDate,
    ) -> Result<Vec<Invoice>, PortError> {
        let state = self.state.lock().await;
        state.check_available()?;
        let mut overdue: Vec<Invoice> = state
            .invoices
            .iter()
            .filter(|i| i.customer_id == customer_id && i.is_overdue(as_of))
            .cloned()
            .collect();
        overdue.sort_by_key(|i| (i.due_date, i.id));
        Ok(overdue)
    }

    async fn update_invoice(
        &self,
        invoice_id: InvoiceId,
        changes: InvoiceChanges,
    ) -> Result<Invoice, PortError> {
        let mut state = self.state.lock().await;
        state.check_available()?;

        let position = state
            .invoices
            .iter()
            .position(|i| i.id == invoice_id)
            .ok_or_else(|| PortError::not_found("Invoice", invoice_id))?;
        let current = &state.invoices[position];
        let updated = changes.apply(current, Utc::now()).map_err(to_port_error)?;

        if updated.is_open()
            && !current.is_open()
            && state
                .invoices
                .iter()
                .any(|i| i.id != invoice_id && i.bl_number == updated.bl_number && i.is_open())
        {
            return Err(PortError::conflict(format!(
                "bill of lading {} already has an open invoice",
                updated.bl_number
            )));
        }

        state.invoices[position] = updated.clone();
        Ok(updated)
    }

    async fn audit_entries_for(
        &self,
        resource_type: &str,
        resource_id: i64,
    ) -> Result<Vec<AuditEntry>, PortError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state
            .audit
            .iter()
            .filter(|e| e.resource_type == resource_type && e.resource_id == resource_id)
            .cloned()
            .collect())
    }
}

/// Transaction over the in-memory store
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    savepoint: Option<MemoryState>,
}

#[async_trait]
impl AuditRecorder for InMemoryTransaction {
    async fn record(&mut self, entry: NewAuditEntry) -> Result<AuditEntry, PortError> {
        self.working.record(entry)
    }
}

#[async_trait]
impl DemurrageTransaction for InMemoryTransaction {
    async fn became_overdue_on(
        &mut self,
        customer_id: CustomerId,
        date: NaiveDate,
    ) -> Result<Vec<BillOfLading>, PortError> {
        Ok(self.working.became_overdue_on(customer_id, date))
    }

    async fn has_open_invoice(&mut self, bl_number: &BlNumber) -> Result<bool, PortError> {
        Ok(self.working.has_open_invoice(bl_number))
    }

    async fn insert_invoice(&mut self, invoice: &NewInvoice) -> Result<Invoice, PortError> {
        self.working.insert_invoice(invoice)
    }

    async fn savepoint(&mut self) -> Result<(), PortError> {
        self.savepoint = Some(self.working.clone());
        Ok(())
    }

    async fn release_savepoint(&mut self) -> Result<(), PortError> {
        self.savepoint = None;
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self) -> Result<(), PortError> {
        let saved = self
            .savepoint
            .take()
            .ok_or_else(|| PortError::internal("no active savepoint"))?;
        self.working = saved;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let InMemoryTransaction { mut guard, working, .. } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PortError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bill_of_lading::ContainerCounts;
    use core_kernel::{Currency, Money};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded() -> (InMemoryDemurrageStore, Customer) {
        let store = InMemoryDemurrageStore::new();
        let customer = store
            .create_customer(NewCustomer::new("Alpha Trading Co.", "CUST001"))
            .await
            .unwrap();
        store
            .create_bill_of_lading(ValidBillOfLading {
                bl_number: BlNumber::parse("BL1").unwrap(),
                customer_id: customer.id,
                arrival_date: date(2026, 1, 1),
                free_time_days: 5,
                containers: ContainerCounts {
                    twenty_ft: 1,
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        (store, customer)
    }

    fn new_invoice(customer: &Customer) -> NewInvoice {
        NewInvoice::new(
            customer.id,
            BlNumber::parse("BL1").unwrap(),
            Money::new(dec!(80), Currency::USD),
        )
        .with_due_date(date(2026, 2, 1))
    }

    #[tokio::test]
    async fn test_duplicate_bl_number_rejected() {
        let (store, customer) = seeded().await;
        let err = store
            .create_bill_of_lading(ValidBillOfLading {
                bl_number: BlNumber::parse("BL1").unwrap(),
                customer_id: customer.id,
                arrival_date: date(2026, 1, 1),
                free_time_days: 0,
                containers: ContainerCounts::default(),
            })
            .await
            .unwrap_err();
        assert!(err.is_record_rejection());
    }

    #[tokio::test]
    async fn test_uncommitted_transaction_leaves_no_trace() {
        let (store, customer) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        tx.insert_invoice(&new_invoice(&customer)).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.invoice_count().await, 0);
    }

    #[tokio::test]
    async fn test_second_open_invoice_conflicts() {
        let (store, customer) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        tx.insert_invoice(&new_invoice(&customer)).await.unwrap();
        let err = tx.insert_invoice(&new_invoice(&customer)).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict { .. }));
        tx.commit().await.unwrap();

        assert_eq!(store.invoice_count().await, 1);
    }

    #[tokio::test]
    async fn test_rollback_to_savepoint() {
        let (store, customer) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        tx.savepoint().await.unwrap();
        tx.insert_invoice(&new_invoice(&customer)).await.unwrap();
        tx.rollback_to_savepoint().await.unwrap();
        assert!(!tx.has_open_invoice(&BlNumber::parse("BL1").unwrap()).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(store.invoice_count().await, 0);
    }

    #[tokio::test]
    async fn test_amount_update_rejected() {
        let (store, customer) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let invoice = tx.insert_invoice(&new_invoice(&customer)).await.unwrap();
        tx.commit().await.unwrap();

        let err = store
            .update_invoice(
                invoice.id,
                InvoiceChanges {
                    amount: Some(dec!(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot be modified"));
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let (store, _) = seeded().await;
        store.inject_fault(Fault::Unavailable).await;

        assert!(store.begin().await.is_err());
        assert!(!store.health_check().await.is_healthy());

        store.clear_faults().await;
        assert!(store.health_check().await.is_healthy());
    }
}
