//! Domain Adapters
//!
//! Implementations of domain ports backed by PostgreSQL.
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresDemurrageAdapter;
//! use domain_demurrage::DemurragePort;
//!
//! let adapter = PostgresDemurrageAdapter::new(pool);
//! let overdue = adapter.overdue_invoices(customer_id, today).await?;
//! ```

pub mod demurrage;

pub use demurrage::{PgDemurrageTransaction, PostgresDemurrageAdapter};
