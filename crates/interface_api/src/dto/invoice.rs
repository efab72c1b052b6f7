//! Invoice DTOs

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use domain_demurrage::{GenerationSummary, Invoice, SkippedBillOfLading};

/// Customer identifier as sent by callers: a numeric id or a code
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CustomerParam {
    Id(i64),
    Code(String),
}

impl fmt::Display for CustomerParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerParam::Id(id) => write!(f, "{}", id),
            CustomerParam::Code(code) => f.write_str(code),
        }
    }
}

/// Body of `POST /invoices/generate`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct GenerateInvoicesRequest {
    #[serde(alias = "customer_id")]
    pub customer: Option<CustomerParam>,
    /// `YYYY-MM-DD`; defaults to yesterday
    #[validate(length(max = 10, message = "date must be formatted as YYYY-MM-DD"))]
    pub date: Option<String>,
}

/// Invoice as shown to customers
#[derive(Debug, Serialize)]
pub struct InvoiceView {
    pub id: i64,
    pub bl_number: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
}

impl InvoiceView {
    pub fn render(invoice: &Invoice, today: NaiveDate) -> Self {
        Self {
            id: invoice.id.value(),
            bl_number: invoice.bl_number.as_str().to_string(),
            amount: invoice.amount,
            currency: invoice.currency.code().to_string(),
            status: invoice.status.as_str().to_string(),
            due_date: invoice.due_date,
            days_overdue: invoice.days_overdue(today),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OverdueInvoicesResponse {
    pub invoices: Vec<InvoiceView>,
}

#[derive(Debug, Serialize)]
pub struct SkippedView {
    pub bl_number: String,
    pub reason: String,
}

impl From<&SkippedBillOfLading> for SkippedView {
    fn from(skipped: &SkippedBillOfLading) -> Self {
        Self {
            bl_number: skipped.bl_number.as_str().to_string(),
            reason: skipped.reason.clone(),
        }
    }
}

/// Body returned by `POST /invoices/generate`
#[derive(Debug, Serialize)]
pub struct GenerationSummaryResponse {
    pub created: Vec<InvoiceView>,
    pub skipped: Vec<SkippedView>,
    pub created_count: usize,
    pub skipped_count: usize,
    pub total_amount: Decimal,
}

impl GenerationSummaryResponse {
    pub fn render(summary: &GenerationSummary, today: NaiveDate) -> Self {
        Self {
            created: summary
                .created
                .iter()
                .map(|invoice| InvoiceView::render(invoice, today))
                .collect(),
            skipped: summary.skipped.iter().map(SkippedView::from).collect(),
            created_count: summary.created_count,
            skipped_count: summary.skipped_count,
            total_amount: summary.total_amount,
        }
    }
}
