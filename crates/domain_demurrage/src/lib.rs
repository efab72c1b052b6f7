//! Demurrage Domain - Overdue Shipments and Invoice Generation
//!
//! This crate holds the business rules for billing shipping containers that
//! stay in port past their contractual free time.
//!
//! # Rules
//!
//! - A bill of lading is due `free_time_days` after its arrival date
//! - Once due, every container accrues a fixed fee per day
//!   ([`RATE_PER_CONTAINER_PER_DAY`])
//! - A shipment may carry at most one open invoice (status other than
//!   paid or cancelled)
//!
//! # Invoice generation
//!
//! The [`InvoiceGenerator`] is a daily batch: for one customer and one date it
//! picks the bills of lading that became overdue on exactly that date and
//! creates or skips one invoice per bill, inside a single storage transaction.
//!
//! ```rust,ignore
//! use domain_demurrage::{InvoiceGenerator, GenerationRequest};
//!
//! let generator = InvoiceGenerator::new(port, clock);
//! let summary = generator
//!     .generate(GenerationRequest::parse(Some("CUST001"), None)?)
//!     .await?;
//! println!("created {} invoices", summary.created_count);
//! ```

pub mod audit;
pub mod bill_of_lading;
pub mod clock;
pub mod customer;
pub mod error;
pub mod generator;
pub mod invoice;
pub mod memory;
pub mod ports;
pub mod summary;

pub use audit::{AuditEntry, NewAuditEntry};
pub use bill_of_lading::{
    became_overdue_on, BillOfLading, ContainerCounts, ContainerType, NewBillOfLading,
    ValidBillOfLading, RATE_PER_CONTAINER_PER_DAY,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use customer::{ApiToken, Customer, NewCustomer, DEFAULT_PAYMENT_TERMS_DAYS};
pub use error::DemurrageError;
pub use generator::{issue_invoice, GenerationRequest, InvoiceGenerator, SkipReason};
pub use invoice::{Invoice, InvoiceChanges, InvoiceStatus, NewInvoice, MAX_INVOICE_AMOUNT};
pub use memory::{Fault, InMemoryDemurrageStore};
pub use ports::{AuditRecorder, CustomerLookup, DemurragePort, DemurrageTransaction};
pub use summary::{GenerationSummary, SkippedBillOfLading};
