//! Operational records written by receiving, dispatch and storage.
//!
//! The billing engine only reads these; they are owned by the warehouse
//! workflows.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an inbound receipt that counts toward billing.
pub const RECEIPT_CONFIRMED: &str = "confirmed";

/// Status of an outbound shipment that has left the warehouse.
pub const SHIPMENT_EXPEDITED: &str = "expedited";

/// Inbound receipt with the number of storage units (pallets) it brought in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundReceipt {
    pub receipt_id: Uuid,
    pub recipient_id: Uuid,
    pub location_id: Uuid,
    pub received_on: NaiveDate,
    pub status: String,
    pub storage_units: i64,
}

/// Outbound shipment with its number of line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundShipment {
    pub shipment_id: Uuid,
    pub recipient_id: Uuid,
    pub location_id: Uuid,
    pub dispatched_on: NaiveDate,
    pub status: String,
    pub line_items: i64,
}

/// Storage unit (pallet) currently in the warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageUnit {
    pub unit_id: Uuid,
    pub recipient_id: Uuid,
    pub location_id: Uuid,
    pub remaining_quantity: Decimal,
}
