//! Test Utilities Crate
//!
//! Shared test infrastructure for the demurrage workspace.
//!
//! # Modules
//!
//! - `fixtures`: Scenario dates, sample customers and container mixes
//! - `builders`: Builders for customers, bills of lading and invoices
//! - `database`: PostgreSQL test container with the schema applied
//! - `assertions`: Assertion helpers for generation summaries and invoices
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
