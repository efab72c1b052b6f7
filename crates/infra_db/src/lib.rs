//! Infrastructure Database Layer
//!
//! PostgreSQL storage for the demurrage system using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: repositories own the SQL and the
//! row types, and [`adapters::PostgresDemurrageAdapter`] implements the domain's
//! `DemurragePort` on top of them, translating [`DatabaseError`] into
//! `PortError`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresDemurrageAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/demurrage")).await?;
//! run_migrations(&pool).await?;
//! let adapter = PostgresDemurrageAdapter::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::PostgresDemurrageAdapter;
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
