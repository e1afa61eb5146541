//! Freight cost resolution against one table or every table of a payer.

use crate::error::BillingError;
use crate::freight::{RateBracketStore, RateTable};
use crate::models::FreightQuote;
use crate::services::{record_freight_quote, RateTableStore};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Weight up to which a bracket charges its flat value.
const FLAT_RATE_WEIGHT_KG: Decimal = Decimal::from_parts(300, 0, 0, false, 0);
const KG_PER_TON: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Price `distance` and `weight` against a single table.
pub fn resolve_single_table(
    table: &RateTable,
    distance: Decimal,
    weight: Decimal,
) -> Result<FreightQuote, BillingError> {
    if !table.is_active() {
        return Err(BillingError::NoActiveTable(table.name().to_string()));
    }
    validate_inputs(distance, weight)?;

    let bracket = table
        .find_bracket(distance)
        .ok_or_else(|| BillingError::NoBracketForDistance {
            table: table.name().to_string(),
            distance,
        })?;

    let freight_value = if weight <= FLAT_RATE_WEIGHT_KG {
        Some(bracket.value_up_to_300kg)
    } else {
        weight.checked_mul(bracket.value_per_kg_above_300)
    };
    let toll_value = weight
        .checked_div(KG_PER_TON)
        .and_then(|tons| tons.checked_mul(bracket.toll_per_ton));
    let (freight_value, toll_value, total_value) = freight_value
        .zip(toll_value)
        .and_then(|(freight, toll)| Some((freight, toll, freight.checked_add(toll)?)))
        .ok_or_else(|| BillingError::InvalidRequest("weight out of range".to_string()))?;

    Ok(FreightQuote {
        table_id: table.id(),
        table_name: table.name().to_string(),
        is_house_table: table.is_house_table(),
        bracket: bracket.clone(),
        freight_value,
        toll_value,
        total_value,
        lead_time_days: bracket.lead_time_days,
    })
}

fn validate_inputs(distance: Decimal, weight: Decimal) -> Result<(), BillingError> {
    if distance < Decimal::ZERO {
        return Err(BillingError::InvalidRequest(
            "distance must not be negative".to_string(),
        ));
    }
    if weight < Decimal::ZERO {
        return Err(BillingError::InvalidRequest(
            "weight must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// Stable ascending sort by total; equal totals keep their table order.
pub fn rank_quotes(mut quotes: Vec<FreightQuote>) -> Vec<FreightQuote> {
    quotes.sort_by(|a, b| a.total_value.cmp(&b.total_value));
    quotes
}

#[derive(Clone)]
pub struct FreightTariffResolver {
    tables: RateBracketStore,
}

impl FreightTariffResolver {
    pub fn new(store: Arc<dyn RateTableStore>) -> Self {
        Self {
            tables: RateBracketStore::new(store),
        }
    }

    /// Quote a named table.
    #[instrument(skip(self))]
    pub async fn quote_table(
        &self,
        table_id: Uuid,
        distance: Decimal,
        weight: Decimal,
    ) -> Result<FreightQuote, BillingError> {
        let result = async {
            validate_inputs(distance, weight)?;
            let table = self.tables.load_table(table_id).await?;
            resolve_single_table(&table, distance, weight)
        }
        .await;

        record_freight_quote("single", outcome(&result));
        result
    }

    /// Quote every active table of a payer, cheapest first.
    ///
    /// Tables that cannot price the request are skipped. Fails only when the
    /// payer has no active table at all.
    #[instrument(skip(self))]
    pub async fn quote_all_for_payer(
        &self,
        payer_id: Uuid,
        distance: Decimal,
        weight: Decimal,
    ) -> Result<Vec<FreightQuote>, BillingError> {
        let result = self.collect_payer_quotes(payer_id, distance, weight).await;
        record_freight_quote("payer", outcome(&result));
        result
    }

    async fn collect_payer_quotes(
        &self,
        payer_id: Uuid,
        distance: Decimal,
        weight: Decimal,
    ) -> Result<Vec<FreightQuote>, BillingError> {
        validate_inputs(distance, weight)?;

        let loaded = self.tables.active_tables_for_payer(payer_id).await?;
        if loaded.is_empty() {
            return Err(BillingError::NoActiveTable(format!("payer {}", payer_id)));
        }

        let mut quotes = Vec::with_capacity(loaded.len());
        for entry in loaded {
            let quote = entry.and_then(|table| resolve_single_table(&table, distance, weight));
            match quote {
                Ok(quote) => quotes.push(quote),
                Err(BillingError::Storage(e)) => return Err(BillingError::Storage(e)),
                Err(e) => warn!(error = %e, "Skipping rate table"),
            }
        }

        let quotes = rank_quotes(quotes);
        info!(quotes = quotes.len(), "Freight quotes resolved");
        Ok(quotes)
    }
}

fn outcome<T>(result: &Result<T, BillingError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    }
}
