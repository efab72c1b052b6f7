//! Strongly-typed identifiers for domain entities
//!
//! Storage-assigned sequence ids are wrapped in newtypes so a customer id can
//! never be passed where an invoice id is expected. Shipments are identified by
//! their bill-of-lading number, and every generation run gets a time-ordered
//! UUID for log correlation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! define_seq_id {
    ($name:ident, $entity:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a storage-assigned sequence value
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw sequence value
            pub fn value(&self) -> i64 {
                self.0
            }

            /// Returns the entity name used in messages
            pub fn entity() -> &'static str {
                $entity
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|v| *v > 0)
                    .map(Self)
                    .ok_or_else(|| CoreError::validation(format!("invalid {} id: '{}'", $entity, s)))
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

define_seq_id!(CustomerId, "customer");
define_seq_id!(BillOfLadingId, "bill of lading");
define_seq_id!(InvoiceId, "invoice");
define_seq_id!(AuditEntryId, "audit entry");

/// Identifier of a single invoice generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new time-ordered identifier (v7)
    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new_v7()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RUN-{}", self.0)
    }
}

/// Bill-of-lading number, the business identity of a shipment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlNumber(String);

impl BlNumber {
    /// Prefix of generated numbers
    pub const GENERATED_PREFIX: &'static str = "BL_";

    /// Parses a caller-supplied number, rejecting blank values
    pub fn parse(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CoreError::validation("bl_number can't be blank"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Generates a random number of the form `BL_` followed by 12 hex digits
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("{}{}", Self::GENERATED_PREFIX, &hex[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for BlNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BlNumber {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for BlNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_id_display_and_parse() {
        let id = InvoiceId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<InvoiceId>().unwrap(), id);
    }

    #[test]
    fn test_seq_id_rejects_non_positive() {
        assert!("0".parse::<CustomerId>().is_err());
        assert!("-3".parse::<CustomerId>().is_err());
        assert!("abc".parse::<CustomerId>().is_err());
    }

    #[test]
    fn test_generated_bl_number_shape() {
        let bl = BlNumber::generate();
        let suffix = bl.as_str().strip_prefix("BL_").unwrap();
        assert_eq!(suffix.len(), 12);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_blank_bl_number_rejected() {
        assert!(BlNumber::parse("   ").is_err());
        assert_eq!(BlNumber::parse(" BL1 ").unwrap().as_str(), "BL1");
    }

    #[test]
    fn test_run_ids_are_time_ordered() {
        let a = RunId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = RunId::new_v7();
        assert!(a.as_uuid() < b.as_uuid());
        assert!(a.to_string().starts_with("RUN-"));
    }
}
