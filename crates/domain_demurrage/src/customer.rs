//! Customers
//!
//! A customer owns bills of lading and invoices. Its payment terms are only used
//! to default an invoice's due date.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use core_kernel::CustomerId;

use crate::error::DemurrageError;

/// Payment terms applied when a customer is created without explicit terms
pub const DEFAULT_PAYMENT_TERMS_DAYS: u32 = 15;

/// Secret token a customer presents in the `X-Api-Token` header
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates `token_` followed by 32 random hex digits
    pub fn generate() -> Self {
        Self(format!("token_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens never show up in logs.
impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

/// A customer account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Unique business code, e.g. `CUST001`
    pub code: String,
    pub payment_terms_days: u32,
    #[serde(skip_serializing)]
    pub api_token: ApiToken,
    pub created_at: DateTime<Utc>,
}

/// Request for creating a customer
#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub name: String,
    pub code: String,
    pub payment_terms_days: Option<u32>,
    pub api_token: Option<ApiToken>,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn with_payment_terms(mut self, days: u32) -> Self {
        self.payment_terms_days = Some(days);
        self
    }

    pub fn with_api_token(mut self, token: ApiToken) -> Self {
        self.api_token = Some(token);
        self
    }

    /// Checks required fields and fills defaults: payment terms and a generated token
    pub fn prepare(mut self) -> Result<Self, DemurrageError> {
        self.name = self.name.trim().to_string();
        self.code = self.code.trim().to_string();
        if self.name.is_empty() {
            return Err(DemurrageError::validation("Name can't be blank"));
        }
        if self.code.is_empty() {
            return Err(DemurrageError::validation("Code can't be blank"));
        }
        if self.api_token.as_ref().map_or(true, |t| t.as_str().trim().is_empty()) {
            self.api_token = Some(ApiToken::generate());
        }
        self.payment_terms_days.get_or_insert(DEFAULT_PAYMENT_TERMS_DAYS);
        Ok(self)
    }
}
