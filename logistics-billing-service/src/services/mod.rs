//! Services module for logistics-billing-service.

pub mod database;
pub mod memory;
pub mod metrics;
pub mod store;

pub use database::Database;
pub use memory::InMemoryStore;
pub use metrics::{
    get_metrics, init_metrics, record_error, record_freight_quote, record_invoice_generated,
};
pub use store::{InsertInvoiceOutcome, InvoiceStore, RateTableStore, StoreHealth, UsageSource};
