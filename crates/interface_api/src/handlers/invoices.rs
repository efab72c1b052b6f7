//! Invoice handlers

use axum::{
    body::Bytes,
    extract::{Path, State},
    Extension, Json,
};
use tracing::info;
use validator::Validate;

use core_kernel::InvoiceId;
use domain_demurrage::{Customer, GenerationRequest};

use crate::dto::invoice::*;
use crate::error::ApiError;
use crate::AppState;

/// Lists the customer's open invoices that are past due, oldest first
pub async fn list_overdue(
    State(state): State<AppState>,
    Extension(customer): Extension<Customer>,
) -> Result<Json<OverdueInvoicesResponse>, ApiError> {
    let today = state.clock.today();
    let invoices = state.port.overdue_invoices(customer.id, today).await?;

    Ok(Json(OverdueInvoicesResponse {
        invoices: invoices
            .iter()
            .map(|invoice| InvoiceView::render(invoice, today))
            .collect(),
    }))
}

/// Gets one of the customer's invoices
pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(customer): Extension<Customer>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceView>, ApiError> {
    let invoice = state
        .port
        .find_invoice(customer.id, InvoiceId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Invoice not found: {}", id)))?;

    Ok(Json(InvoiceView::render(&invoice, state.clock.today())))
}

/// Runs invoice generation for one customer
///
/// An empty body is treated as `{}` so the missing customer is reported as a
/// validation error rather than a parse failure.
pub async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerationSummaryResponse>, ApiError> {
    let request: GenerateInvoicesRequest = if body.is_empty() {
        GenerateInvoicesRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    request.validate()?;

    let customer = request.customer.as_ref().map(ToString::to_string);
    let generation = GenerationRequest::parse(customer.as_deref(), request.date.as_deref())?;

    let summary = state.generator.generate(generation).await?;
    info!(
        created = summary.created_count,
        skipped = summary.skipped_count,
        "Generation run completed over HTTP"
    );

    Ok(Json(GenerationSummaryResponse::render(&summary, state.clock.today())))
}
