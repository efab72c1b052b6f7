//! Core Kernel - Foundational types shared by the demurrage crates
//!
//! This crate provides the building blocks used across the workspace:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for customers, invoices and shipments
//! - Port traits and errors for the hexagonal storage boundary

pub mod money;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{
    BlNumber, CustomerId, InvoiceId, AuditEntryId, BillOfLadingId, RunId,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
pub use error::CoreError;
