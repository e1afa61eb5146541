use crate::models::FreightQuote;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Single-table quote request. Distance in km, weight in kg.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreightQuoteRequest {
    pub rate_table_id: Uuid,
    pub distance: Decimal,
    pub weight: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerQuotesRequest {
    pub payer_id: Uuid,
    pub distance: Decimal,
    pub weight: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuotesResponse {
    pub quotes: Vec<FreightQuote>,
}
