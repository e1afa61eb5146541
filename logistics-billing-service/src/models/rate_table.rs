//! Freight rate table records and quotes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Rate table header as stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RateTableRecord {
    pub table_id: Uuid,
    pub payer_id: Uuid,
    /// `None` for house (owner-operated) tables.
    pub transporter_id: Option<Uuid>,
    pub name: String,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

/// Distance bracket of a rate table. The distance range is closed on both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RateBracket {
    pub bracket_id: Uuid,
    pub table_id: Uuid,
    pub distance_min: Decimal,
    pub distance_max: Decimal,
    pub value_up_to_300kg: Decimal,
    pub value_per_kg_above_300: Decimal,
    pub toll_per_ton: Decimal,
    pub lead_time_days: i32,
}

/// Freight cost resolved from one rate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreightQuote {
    pub table_id: Uuid,
    pub table_name: String,
    pub is_house_table: bool,
    pub bracket: RateBracket,
    pub freight_value: Decimal,
    pub toll_value: Decimal,
    pub total_value: Decimal,
    pub lead_time_days: i32,
}
