//! Billing period calculation.
//!
//! A period always covers the most recently *completed* cycle relative to the
//! invocation time, never the cycle in progress.

use crate::error::BillingError;
use crate::models::BillingCadence;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive date window an invoice covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BillingPeriod {
    /// Number of calendar days in the period, both ends included.
    pub fn day_count(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Period for the given cadence, anchored to `now`.
    pub fn for_cadence(cadence: BillingCadence, now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let first_of_month = today - Duration::days(today.day0() as i64);
        let last_of_previous_month = first_of_month - Duration::days(1);

        match cadence {
            BillingCadence::Monthly => BillingPeriod {
                start: last_of_previous_month - Duration::days(last_of_previous_month.day0() as i64),
                end: last_of_previous_month,
            },
            BillingCadence::Weekly => {
                let end = today - Duration::days(1);
                BillingPeriod {
                    start: end - Duration::days(6),
                    end,
                }
            }
            BillingCadence::Biweekly => {
                let end = today - Duration::days(1);
                BillingPeriod {
                    start: end - Duration::days(14),
                    end,
                }
            }
            BillingCadence::Annual => BillingPeriod {
                start: first_of_month - Months::new(12),
                end: last_of_previous_month,
            },
        }
    }
}

/// Compute the period for a stored cadence value.
pub fn compute_period(cadence: &str, now: DateTime<Utc>) -> Result<BillingPeriod, BillingError> {
    let cadence = BillingCadence::parse(cadence)?;
    Ok(BillingPeriod::for_cadence(cadence, now))
}
