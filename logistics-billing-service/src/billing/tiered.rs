//! Tiered (included allowance + overage) pricing of metered usage.

use crate::error::BillingError;
use crate::models::ContractServiceItem;
use rust_decimal::Decimal;

/// Pricing terms of one contracted service line.
///
/// Quantities and prices are non-negative. The minimum only floors usage that
/// stays within the included allowance, so a minimum above the allowance
/// applies to zero usage alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTerms {
    included_quantity: i64,
    minimum_quantity: i64,
    unit_price: Decimal,
    overage_unit_price: Option<Decimal>,
}

impl ServiceTerms {
    pub fn new(
        included_quantity: i64,
        minimum_quantity: i64,
        unit_price: Decimal,
        overage_unit_price: Option<Decimal>,
    ) -> Result<Self, String> {
        if included_quantity < 0 {
            return Err("included quantity must not be negative".to_string());
        }
        if minimum_quantity < 0 {
            return Err("minimum quantity must not be negative".to_string());
        }
        if unit_price < Decimal::ZERO {
            return Err("unit price must not be negative".to_string());
        }
        if matches!(overage_unit_price, Some(p) if p < Decimal::ZERO) {
            return Err("overage unit price must not be negative".to_string());
        }

        Ok(Self {
            included_quantity,
            minimum_quantity,
            unit_price,
            overage_unit_price,
        })
    }

    /// Terms of a stored service item; absent quantities default to zero.
    pub fn from_item(item: &ContractServiceItem) -> Result<Self, BillingError> {
        Self::new(
            item.included_quantity.unwrap_or(0),
            item.minimum_quantity.unwrap_or(0),
            item.unit_price,
            item.overage_unit_price,
        )
        .map_err(|reason| BillingError::InvalidServiceItem {
            item_id: item.item_id.to_string(),
            reason,
        })
    }

    pub fn included_quantity(&self) -> i64 {
        self.included_quantity
    }

    pub fn minimum_quantity(&self) -> i64 {
        self.minimum_quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// Marginal price beyond the allowance; the unit price when no overage price is set.
    pub fn overage_price(&self) -> Decimal {
        self.overage_unit_price.unwrap_or(self.unit_price)
    }
}

/// Billable outcome for a metered quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieredCharge {
    pub quantity_billed: i64,
    pub amount: Decimal,
}

/// Price `quantity_used` under `terms`.
pub fn price_usage(quantity_used: i64, terms: &ServiceTerms) -> TieredCharge {
    if quantity_used <= terms.included_quantity {
        let quantity_billed = quantity_used.max(terms.minimum_quantity);
        TieredCharge {
            quantity_billed,
            amount: Decimal::from(quantity_billed) * terms.unit_price,
        }
    } else {
        let excess = quantity_used - terms.included_quantity;
        TieredCharge {
            quantity_billed: quantity_used,
            amount: Decimal::from(terms.included_quantity) * terms.unit_price
                + Decimal::from(excess) * terms.overage_price(),
        }
    }
}
