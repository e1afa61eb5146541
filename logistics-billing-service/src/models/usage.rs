//! Usage calculation and operational volume models.

use super::CreateLineItem;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Priced usage of one contracted service item for a billing period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageCalculation {
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
    /// Raw counts the quantity was derived from, kept for audit.
    pub computation_detail: serde_json::Value,
}

impl UsageCalculation {
    pub fn to_line_item(&self, sort_order: i32) -> CreateLineItem {
        CreateLineItem {
            service_item_id: self.service_item_id,
            service_kind: self.service_kind.clone(),
            description: self.description.clone(),
            quantity_used: self.quantity_used,
            quantity_included: self.quantity_included,
            quantity_minimum: self.quantity_minimum,
            quantity_billed: self.quantity_billed,
            unit_price: self.unit_price,
            overage_price: self.overage_price,
            amount: self.amount,
            computation_detail: self.computation_detail.clone(),
            sort_order,
        }
    }
}

/// Confirmed inbound receipts and the storage units they brought in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboundVolume {
    pub receipts: i64,
    pub units: i64,
}

/// Dispatched outbound shipments and their line items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboundVolume {
    pub shipments: i64,
    pub line_items: i64,
}
