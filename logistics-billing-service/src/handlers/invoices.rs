use crate::dtos::{
    GenerateInvoiceRequest, GenerateInvoiceResponse, InvoiceDetailResponse, InvoiceResponse,
    LineItemResponse, UsageCalculationResponse,
};
use crate::error::{BillingError, InvoiceGenerationError};
use crate::services::record_error;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

pub async fn generate_invoice(
    State(state): State<AppState>,
    payload: Result<Json<GenerateInvoiceRequest>, JsonRejection>,
) -> Result<Json<GenerateInvoiceResponse>, InvoiceGenerationError> {
    let Json(request) = payload
        .map_err(|e| BillingError::InvalidRequest(e.body_text()))
        .inspect_err(|e| record_error(e.kind(), "generate_invoice"))?;

    let generated = state
        .assembler
        .generate(&request.contract_id, Utc::now())
        .await
        .inspect_err(|e| record_error(e.kind(), "generate_invoice"))?;

    let message = format!(
        "Invoice {} generated successfully",
        generated.invoice.invoice_number
    );

    Ok(Json(GenerateInvoiceResponse {
        success: true,
        invoice: InvoiceResponse::from(generated.invoice),
        items: generated
            .items
            .into_iter()
            .map(UsageCalculationResponse::from)
            .collect(),
        message,
    }))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<Json<InvoiceDetailResponse>, BillingError> {
    let invoice_id = Uuid::parse_str(&invoice_id)
        .map_err(|_| BillingError::InvalidRequest(format!("invalid invoice id: {}", invoice_id)))?;

    let invoice = state
        .invoices
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Invoice not found: {}", invoice_id))
        })?;
    let line_items = state.invoices.get_line_items(invoice_id).await?;

    Ok(Json(InvoiceDetailResponse {
        invoice: InvoiceResponse::from(invoice),
        line_items: line_items.into_iter().map(LineItemResponse::from).collect(),
    }))
}
