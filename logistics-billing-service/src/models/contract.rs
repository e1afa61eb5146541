//! Contract and contracted service item models.

use crate::error::BillingError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Billing cadence of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCadence {
    Weekly,
    Biweekly,
    Monthly,
    Annual,
}

impl BillingCadence {
    /// Parse a stored cadence value. Unknown values are rejected.
    pub fn parse(s: &str) -> Result<Self, BillingError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(BillingCadence::Weekly),
            "biweekly" => Ok(BillingCadence::Biweekly),
            "monthly" => Ok(BillingCadence::Monthly),
            "annual" => Ok(BillingCadence::Annual),
            _ => Err(BillingError::InvalidCadence(s.to_string())),
        }
    }
}

/// Contract status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Active,
    Suspended,
    Terminated,
}

impl ContractStatus {
    pub fn from_string(s: &str) -> Self {
        match s {
            "active" => ContractStatus::Active,
            "suspended" => ContractStatus::Suspended,
            "terminated" => ContractStatus::Terminated,
            _ => ContractStatus::Draft,
        }
    }
}

/// Warehousing contract between a payer and a service recipient.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contract {
    pub contract_id: Uuid,
    pub payer_id: Uuid,
    pub recipient_id: Uuid,
    pub location_id: Uuid,
    pub billing_cadence: String,
    pub due_days: Option<i32>,
    pub status: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Contract {
    pub fn is_active(&self) -> bool {
        ContractStatus::from_string(&self.status) == ContractStatus::Active
    }
}

/// Metered service kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    InboundUnit,
    OutboundUnit,
    StorageUnitDay,
}

impl ServiceKind {
    /// Parse a stored service kind; `None` for kinds that are not metered.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "inbound_unit" => Some(ServiceKind::InboundUnit),
            "outbound_unit" => Some(ServiceKind::OutboundUnit),
            "storage_unit_day" => Some(ServiceKind::StorageUnitDay),
            _ => None,
        }
    }
}

/// Service line contracted on a contract.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContractServiceItem {
    pub item_id: Uuid,
    pub contract_id: Uuid,
    pub service_kind: String,
    pub description: String,
    pub included_quantity: Option<i64>,
    pub minimum_quantity: Option<i64>,
    pub unit_price: Decimal,
    pub overage_unit_price: Option<Decimal>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}
