use crate::models::{Invoice, InvoiceLineItem, UsageCalculation};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInvoiceRequest {
    pub contract_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInvoiceResponse {
    pub success: bool,
    pub invoice: InvoiceResponse,
    pub items: Vec<UsageCalculationResponse>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: Uuid,
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
    pub created_at: String,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.invoice_id,
            contract_id: invoice.contract_id,
            invoice_number: invoice.invoice_number,
            period_start: invoice.period_start,
            period_end: invoice.period_end,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            service_amount: invoice.service_amount,
            total_amount: invoice.total_amount,
            status: invoice.status,
            notes: invoice.notes,
            created_at: invoice.created_utc.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCalculationResponse {
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
}

impl From<UsageCalculation> for UsageCalculationResponse {
    fn from(calc: UsageCalculation) -> Self {
        Self {
            service_item_id: calc.service_item_id,
            service_kind: calc.service_kind,
            description: calc.description,
            quantity_used: calc.quantity_used,
            quantity_included: calc.quantity_included,
            quantity_minimum: calc.quantity_minimum,
            quantity_billed: calc.quantity_billed,
            unit_price: calc.unit_price,
            overage_price: calc.overage_price,
            amount: calc.amount,
            computation_detail: calc.computation_detail,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub id: Uuid,
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

impl From<InvoiceLineItem> for LineItemResponse {
    fn from(item: InvoiceLineItem) -> Self {
        Self {
            id: item.line_item_id,
            service_item_id: item.service_item_id,
            service_kind: item.service_kind,
            description: item.description,
            quantity_used: item.quantity_used,
            quantity_included: item.quantity_included,
            quantity_minimum: item.quantity_minimum,
            quantity_billed: item.quantity_billed,
            unit_price: item.unit_price,
            overage_price: item.overage_price,
            amount: item.amount,
            computation_detail: item.computation_detail,
            sort_order: item.sort_order,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetailResponse {
    pub invoice: InvoiceResponse,
    pub line_items: Vec<LineItemResponse>,
}
