//! Invoice and invoice line item models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invoice status. Generated invoices always start as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
        }
    }
}

/// Invoice header.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub contract_id: Uuid,
    pub invoice_number: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub service_amount: Decimal,
    pub total_amount: Decimal,
    pub status: String,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating an invoice header.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub contract_id: Uuid,
    pub invoice_number: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub service_amount: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
}

/// Line item snapshot of one service item's usage calculation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceLineItem {
    pub line_item_id: Uuid,
    pub invoice_id: Uuid,
    pub service_item_id: Uuid,
    pub service_kind: String,
    pub description: String,
    pub quantity_used: i64,
    pub quantity_included: i64,
    pub quantity_minimum: i64,
    pub quantity_billed: i64,
    pub unit_price: Decimal,
    pub overage_price: Decimal,
    pub amount: Decimal,
    pub computation_detail: serde_json::Value,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a line item.
#[derive(Debug, Clone)]
pub struct CreateLineItem {
    pub service_item_id: Uuid,
    pub service_kind: String,
    pub description: String,
    pub quantity_used: i64,
    pub quantity_included: i64,
    pub quantity_minimum: i64,
    pub quantity_billed: i64,
    pub unit_price: Decimal,
    pub overage_price: Decimal,
    pub amount: Decimal,
    pub computation_detail: serde_json::Value,
    pub sort_order: i32,
}
