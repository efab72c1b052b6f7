//! Generation summary

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{BlNumber, Currency, Money};

use crate::error::DemurrageError;
use crate::invoice::Invoice;

/// A bill of lading that did not get an invoice, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedBillOfLading {
    pub bl_number: BlNumber,
    pub reason: String,
}

/// Result of one generation run, in candidate order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub created: Vec<Invoice>,
    pub skipped: Vec<SkippedBillOfLading>,
    pub created_count: usize,
    pub skipped_count: usize,
    pub total_amount: Decimal,
}

impl GenerationSummary {
    /// Assembles the summary; `total_amount` is the exact sum of created amounts
    pub fn assemble(
        created: Vec<Invoice>,
        skipped: Vec<SkippedBillOfLading>,
        currency: Currency,
    ) -> Result<Self, DemurrageError> {
        let amounts: Vec<Money> = created.iter().map(Invoice::money).collect();
        let total = Money::checked_sum(&amounts, currency)?;

        Ok(Self {
            created_count: created.len(),
            skipped_count: skipped.len(),
            created,
            skipped,
            total_amount: total.amount(),
        })
    }

    /// Number of candidates the run accounted for
    pub fn candidate_count(&self) -> usize {
        self.created_count + self.skipped_count
    }
}
