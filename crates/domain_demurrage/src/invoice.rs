//! Demurrage invoices
//!
//! Invoices are created through [`NewInvoice`], which applies the defaults
//! (draft status, USD, due date from payment terms) explicitly before the
//! record reaches storage. After creation the amount is fixed: the only update
//! path, [`InvoiceChanges`], refuses to touch it.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{BlNumber, Currency, CustomerId, InvoiceId, Money};

use crate::bill_of_lading::BillOfLading;
use crate::customer::Customer;
use crate::error::DemurrageError;

/// Largest amount the `invoices.amount NUMERIC(12,0)` column holds
pub const MAX_INVOICE_AMOUNT: Decimal = dec!(999999999999);

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Created, not yet sent
    #[default]
    Draft,
    /// Sent to the customer
    Sent,
    /// Settled
    Paid,
    /// Voided
    Cancelled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Paid,
        InvoiceStatus::Cancelled,
    ];

    /// Statuses that close an invoice
    pub const CLOSED: [InvoiceStatus; 2] = [InvoiceStatus::Paid, InvoiceStatus::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// An invoice is open until it is paid or cancelled
    pub fn is_open(&self) -> bool {
        !Self::CLOSED.contains(self)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = DemurrageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DemurrageError::validation(format!("Status '{}' is not included in the list", s)))
    }
}

/// A persisted invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub customer_id: CustomerId,
    pub bl_number: BlNumber,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Amount with its currency
    pub fn money(&self) -> Money {
        Money::new(self.amount, self.currency)
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Whole days past the invoice due date, never negative
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        (today - self.due_date).num_days().max(0)
    }

    /// Open and due strictly before `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && self.due_date < today
    }
}

/// An invoice about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub customer_id: CustomerId,
    pub bl_number: BlNumber,
    pub amount: Money,
    pub status: InvoiceStatus,
    pub due_date: Option<NaiveDate>,
}

impl NewInvoice {
    /// Creates a draft invoice without a due date
    pub fn new(customer_id: CustomerId, bl_number: BlNumber, amount: Money) -> Self {
        Self {
            customer_id,
            bl_number,
            amount,
            status: InvoiceStatus::default(),
            due_date: None,
        }
    }

    /// Demurrage invoice for `bill_of_lading`, priced as of `today`
    pub fn for_bill_of_lading(customer: &Customer, bill_of_lading: &BillOfLading, today: NaiveDate) -> Self {
        Self::new(customer.id, bill_of_lading.bl_number.clone(), bill_of_lading.amount(today))
            .resolve_due_date(customer, today)
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Fills a missing due date with `today + payment terms`
    pub fn resolve_due_date(mut self, customer: &Customer, today: NaiveDate) -> Self {
        if self.due_date.is_none() {
            self.due_date = today.checked_add_days(Days::new(u64::from(customer.payment_terms_days)));
        }
        self
    }

    /// Domain validation run before the insert
    pub fn validate(&self) -> Result<(), DemurrageError> {
        if self.amount.is_negative() {
            return Err(DemurrageError::validation("Amount must be greater than or equal to 0"));
        }
        if self.amount.amount() > MAX_INVOICE_AMOUNT {
            return Err(DemurrageError::validation(format!(
                "Amount must be less than or equal to {}",
                MAX_INVOICE_AMOUNT
            )));
        }
        if self.due_date.is_none() {
            return Err(DemurrageError::validation("Due date can't be blank"));
        }
        Ok(())
    }
}

/// Changes applied to an existing invoice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceChanges {
    pub status: Option<InvoiceStatus>,
    pub due_date: Option<NaiveDate>,
    /// Accepted only when equal to the stored amount
    pub amount: Option<Decimal>,
}

impl InvoiceChanges {
    /// Returns `invoice` with the changes applied, or an error if the amount would change
    pub fn apply(&self, invoice: &Invoice, now: DateTime<Utc>) -> Result<Invoice, DemurrageError> {
        if let Some(amount) = self.amount {
            if amount != invoice.amount {
                return Err(DemurrageError::validation("Amount cannot be modified after creation"));
            }
        }

        let mut updated = invoice.clone();
        if let Some(status) = self.status {
            updated.status = status;
        }
        if let Some(due_date) = self.due_date {
            updated.due_date = due_date;
        }
        updated.updated_at = now;
        Ok(updated)
    }
}
