//! Audit trail entries
//!
//! Every invoice the system creates leaves one `invoice_created` entry,
//! written in the same transaction as the invoice itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use core_kernel::AuditEntryId;

use crate::error::DemurrageError;
use crate::invoice::Invoice;

/// Event type recorded when an invoice is created
pub const INVOICE_CREATED: &str = "invoice_created";

/// Actor used for entries written by batch processes
pub const SYSTEM_ACTOR: &str = "system";

/// Resource type for invoice entries
pub const INVOICE_RESOURCE: &str = "Invoice";

/// A stored audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub event_type: String,
    pub actor: String,
    pub resource_type: String,
    pub resource_id: i64,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// An audit entry about to be recorded
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub event_type: String,
    pub actor: String,
    pub resource_type: String,
    pub resource_id: i64,
    pub metadata: Value,
}

impl NewAuditEntry {
    /// Entry for a freshly created invoice
    pub fn invoice_created(invoice: &Invoice) -> Self {
        Self {
            event_type: INVOICE_CREATED.to_string(),
            actor: SYSTEM_ACTOR.to_string(),
            resource_type: INVOICE_RESOURCE.to_string(),
            resource_id: invoice.id.value(),
            metadata: json!({
                "bl_number": invoice.bl_number.as_str(),
                "customer_id": invoice.customer_id.value(),
                "amount": invoice.amount.to_string(),
                "currency": invoice.currency.code(),
            }),
        }
    }

    /// Event type, actor, resource type and resource id are required
    pub fn validate(&self) -> Result<(), DemurrageError> {
        let required = [
            ("Event type", self.event_type.as_str()),
            ("Actor", self.actor.as_str()),
            ("Resource type", self.resource_type.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DemurrageError::validation(format!("{} can't be blank", field)));
            }
        }
        if self.resource_id <= 0 {
            return Err(DemurrageError::validation("Resource can't be blank"));
        }
        Ok(())
    }
}
