//! Usage metering of contracted service items.

use crate::billing::BillingPeriod;
use crate::error::BillingError;
use crate::models::{Contract, ContractServiceItem, ServiceKind};
use crate::services::UsageSource;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Metered quantity and the raw counts it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct MeteredUsage {
    pub quantity_used: i64,
    pub detail: serde_json::Value,
}

impl MeteredUsage {
    fn unmetered() -> Self {
        Self {
            quantity_used: 0,
            detail: json!({}),
        }
    }
}

#[derive(Clone)]
pub struct UsageMeter {
    source: Arc<dyn UsageSource>,
}

impl UsageMeter {
    pub fn new(source: Arc<dyn UsageSource>) -> Self {
        Self { source }
    }

    /// Measure `item` for the contract's recipient and location over `period`.
    ///
    /// Kinds without a meter yield zero usage instead of failing the run.
    #[instrument(skip(self, item, contract), fields(item_id = %item.item_id, kind = %item.service_kind))]
    pub async fn meter(
        &self,
        item: &ContractServiceItem,
        contract: &Contract,
        period: &BillingPeriod,
    ) -> Result<MeteredUsage, BillingError> {
        let Some(kind) = ServiceKind::parse(&item.service_kind) else {
            debug!("No meter for service kind, billing zero usage");
            return Ok(MeteredUsage::unmetered());
        };

        let usage = match kind {
            ServiceKind::InboundUnit => {
                let volume = self
                    .source
                    .inbound_volume(contract.recipient_id, contract.location_id, period)
                    .await?;
                MeteredUsage {
                    quantity_used: volume.units,
                    detail: json!({
                        "receipts": volume.receipts,
                        "units": volume.units,
                    }),
                }
            }
            ServiceKind::OutboundUnit => {
                let volume = self
                    .source
                    .outbound_volume(contract.recipient_id, contract.location_id, period)
                    .await?;
                MeteredUsage {
                    quantity_used: volume.line_items,
                    detail: json!({
                        "shipments": volume.shipments,
                        "lineItems": volume.line_items,
                    }),
                }
            }
            ServiceKind::StorageUnitDay => {
                // Current occupancy stands in for every day of the period.
                let stored_units = self
                    .source
                    .occupied_storage_units(contract.recipient_id, contract.location_id)
                    .await?;
                let days = period.day_count();
                MeteredUsage {
                    quantity_used: stored_units * days,
                    detail: json!({
                        "storedUnits": stored_units,
                        "days": days,
                    }),
                }
            }
        };

        debug!(quantity_used = usage.quantity_used, "Metered usage");
        Ok(usage)
    }
}
