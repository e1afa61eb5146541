use crate::dtos::{FreightQuoteRequest, PayerQuotesRequest, QuotesResponse};
use crate::error::BillingError;
use crate::models::FreightQuote;
use crate::services::record_error;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

pub async fn quote_table(
    State(state): State<AppState>,
    payload: Result<Json<FreightQuoteRequest>, JsonRejection>,
) -> Result<Json<FreightQuote>, BillingError> {
    let Json(request) = payload.map_err(|e| BillingError::InvalidRequest(e.body_text()))?;

    let quote = state
        .freight
        .quote_table(request.rate_table_id, request.distance, request.weight)
        .await
        .inspect_err(|e| record_error(e.kind(), "quote_table"))?;

    Ok(Json(quote))
}

pub async fn quote_payer(
    State(state): State<AppState>,
    payload: Result<Json<PayerQuotesRequest>, JsonRejection>,
) -> Result<Json<QuotesResponse>, BillingError> {
    let Json(request) = payload.map_err(|e| BillingError::InvalidRequest(e.body_text()))?;

    let quotes = state
        .freight
        .quote_all_for_payer(request.payer_id, request.distance, request.weight)
        .await
        .inspect_err(|e| record_error(e.kind(), "quote_payer"))?;

    Ok(Json(QuotesResponse { quotes }))
}
