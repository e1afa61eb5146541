//! Validated rate tables and the store they are loaded from.

use crate::error::BillingError;
use crate::models::{RateBracket, RateTableRecord};
use crate::services::RateTableStore;
use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Rate table with its brackets ordered by distance.
///
/// Invariants: every bracket has `distance_min <= distance_max`, consecutive
/// brackets do not overlap, and no price or lead time is negative.
#[derive(Debug, Clone)]
pub struct RateTable {
    record: RateTableRecord,
    brackets: Vec<RateBracket>,
}

impl RateTable {
    pub fn new(
        record: RateTableRecord,
        mut brackets: Vec<RateBracket>,
    ) -> Result<Self, BillingError> {
        let invalid = |reason: String| BillingError::InvalidRateTable {
            table: record.name.clone(),
            reason,
        };

        brackets.sort_by(|a, b| a.distance_min.cmp(&b.distance_min));

        for bracket in &brackets {
            if bracket.distance_min < Decimal::ZERO {
                return Err(invalid(format!(
                    "bracket {} starts at a negative distance",
                    bracket.bracket_id
                )));
            }
            if bracket.distance_min > bracket.distance_max {
                return Err(invalid(format!(
                    "bracket {} has distance_min {} above distance_max {}",
                    bracket.bracket_id, bracket.distance_min, bracket.distance_max
                )));
            }
            let prices = [
                bracket.value_up_to_300kg,
                bracket.value_per_kg_above_300,
                bracket.toll_per_ton,
            ];
            if prices.iter().any(|p| *p < Decimal::ZERO) {
                return Err(invalid(format!(
                    "bracket {} has a negative price",
                    bracket.bracket_id
                )));
            }
            if bracket.lead_time_days < 0 {
                return Err(invalid(format!(
                    "bracket {} has a negative lead time",
                    bracket.bracket_id
                )));
            }
        }

        for pair in brackets.windows(2) {
            if pair[1].distance_min <= pair[0].distance_max {
                return Err(invalid(format!(
                    "brackets {} and {} overlap",
                    pair[0].bracket_id, pair[1].bracket_id
                )));
            }
        }

        Ok(Self { record, brackets })
    }

    pub fn id(&self) -> Uuid {
        self.record.table_id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn is_active(&self) -> bool {
        self.record.is_active
    }

    /// House tables are run by the payer's own fleet and carry no transporter.
    pub fn is_house_table(&self) -> bool {
        self.record.transporter_id.is_none()
    }

    /// Bracket whose closed range contains `distance`.
    pub fn find_bracket(&self, distance: Decimal) -> Option<&RateBracket> {
        self.brackets
            .iter()
            .find(|b| b.distance_min <= distance && distance <= b.distance_max)
    }
}

/// Read-only loader of validated rate tables.
#[derive(Clone)]
pub struct RateBracketStore {
    store: Arc<dyn RateTableStore>,
}

impl RateBracketStore {
    pub fn new(store: Arc<dyn RateTableStore>) -> Self {
        Self { store }
    }

    /// Load one table with its brackets.
    #[instrument(skip(self))]
    pub async fn load_table(&self, table_id: Uuid) -> Result<RateTable, BillingError> {
        let record = self
            .store
            .get_rate_table(table_id)
            .await?
            .ok_or_else(|| BillingError::NoActiveTable(table_id.to_string()))?;
        let brackets = self.store.get_brackets(table_id).await?;
        RateTable::new(record, brackets)
    }

    /// Load every active table of a payer, fetching bracket sets concurrently.
    ///
    /// Each entry is validated on its own so one broken table does not hide
    /// the others. Entries keep the stored table order.
    #[instrument(skip(self))]
    pub async fn active_tables_for_payer(
        &self,
        payer_id: Uuid,
    ) -> Result<Vec<Result<RateTable, BillingError>>, BillingError> {
        let records = self.store.active_rate_tables(payer_id).await?;
        debug!(tables = records.len(), "Loaded active rate tables");

        let loads = records.into_iter().map(|record| async move {
            let brackets = self.store.get_brackets(record.table_id).await?;
            RateTable::new(record, brackets)
        });

        Ok(join_all(loads).await)
    }
}
