//! Demurrage domain errors

use core_kernel::{MoneyError, PortError};
use thiserror::Error;

/// Errors that can occur in the demurrage domain
#[derive(Debug, Error)]
pub enum DemurrageError {
    /// Missing or malformed caller input, rejected before any storage work
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Customer not found
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Invoice not found
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// A record failed domain validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Storage-layer failure; the surrounding transaction was rolled back
    #[error("Storage failure: {0}")]
    Storage(#[source] PortError),

    /// Money arithmetic failure
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl DemurrageError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        DemurrageError::InvalidInput(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DemurrageError::Validation(message.into())
    }

    /// Returns true for errors caused by the caller rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DemurrageError::InvalidInput(_)
                | DemurrageError::CustomerNotFound(_)
                | DemurrageError::InvoiceNotFound(_)
                | DemurrageError::Validation(_)
        )
    }
}

impl From<PortError> for DemurrageError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::Validation { message, .. } | PortError::Conflict { message } => {
                DemurrageError::Validation(message)
            }
            other => DemurrageError::Storage(other),
        }
    }
}
