//! Freight tariff lookup and quoting.

mod resolver;
mod table;

pub use resolver::{rank_quotes, resolve_single_table, FreightTariffResolver};
pub use table::{RateBracketStore, RateTable};
