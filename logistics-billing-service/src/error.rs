//! Error taxonomy for the billing and freight engines.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use service_core::error::AppError;
use thiserror::Error;

/// Failures surfaced by invoice generation and freight resolution.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Contract not found: {0}")]
    ContractNotFound(String),

    #[error("Invalid billing cadence: {0}")]
    InvalidCadence(String),

    #[error("Already exists an invoice for this period: {invoice_number}")]
    DuplicatePeriod { invoice_number: String },

    #[error("No bracket in rate table '{table}' covers distance {distance}")]
    NoBracketForDistance { table: String, distance: Decimal },

    #[error("No active rate table: {0}")]
    NoActiveTable(String),

    #[error("Invalid rate table '{table}': {reason}")]
    InvalidRateTable { table: String, reason: String },

    #[error("Invalid service item {item_id}: {reason}")]
    InvalidServiceItem { item_id: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Could not allocate an invoice number after {0} attempts")]
    InvoiceNumberExhausted(u32),

    #[error(transparent)]
    Storage(#[from] AppError),
}

impl BillingError {
    /// Short label used for error metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BillingError::ContractNotFound(_) => "contract_not_found",
            BillingError::InvalidCadence(_) => "invalid_cadence",
            BillingError::DuplicatePeriod { .. } => "duplicate_period",
            BillingError::NoBracketForDistance { .. } => "no_bracket_for_distance",
            BillingError::NoActiveTable(_) => "no_active_table",
            BillingError::InvalidRateTable { .. } => "invalid_rate_table",
            BillingError::InvalidServiceItem { .. } => "invalid_service_item",
            BillingError::InvalidRequest(_) => "invalid_request",
            BillingError::InvoiceNumberExhausted(_) => "invoice_number_exhausted",
            BillingError::Storage(_) => "storage",
        }
    }

    /// HTTP status for this failure on the freight and invoice read endpoints.
    ///
    /// Freight lookups that find nothing are 404. Invoice generation uses
    /// [`InvoiceGenerationError`] instead.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::DuplicatePeriod { .. }
            | BillingError::InvalidRequest(_)
            | BillingError::InvalidRateTable { .. } => StatusCode::BAD_REQUEST,
            BillingError::NoBracketForDistance { .. } | BillingError::NoActiveTable(_) => {
                StatusCode::NOT_FOUND
            }
            BillingError::Storage(err) if err.status_code() == StatusCode::NOT_FOUND => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn error_response(status: StatusCode, err: &BillingError) -> Response {
    if status.is_server_error() {
        tracing::error!(error = %err, kind = err.kind(), "Request failed");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

impl IntoResponse for BillingError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), &self)
    }
}

/// Failure of the invoice generation endpoint.
///
/// Only a duplicate period is a client error; any other failure is a 500.
#[derive(Debug)]
pub struct InvoiceGenerationError(pub BillingError);

impl From<BillingError> for InvoiceGenerationError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl InvoiceGenerationError {
    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            BillingError::DuplicatePeriod { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for InvoiceGenerationError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), &self.0)
    }
}
