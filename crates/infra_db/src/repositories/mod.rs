//! Repository implementations for the demurrage tables
//!
//! Each repository owns the SQL for one table and maps rows with `FromRow`.
//! Queries that must run inside a generation run's transaction are associated
//! functions generic over `PgExecutor`, so they accept either the pool or a
//! transaction's connection.

pub mod audit;
pub mod bill_of_lading;
pub mod customer;
pub mod invoice;

pub use audit::{AuditRepository, AuditRow};
pub use bill_of_lading::{BillOfLadingRepository, BillOfLadingRow, NewBillOfLadingRow};
pub use customer::{CustomerRepository, CustomerRow, NewCustomerRow};
pub use invoice::{InvoiceRepository, InvoiceRow, InvoiceUpdateRow, NewInvoiceRow};
