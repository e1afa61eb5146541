//! Usage-based invoice generation.

mod assembler;
mod meter;
mod period;
mod tiered;

pub use assembler::{GeneratedInvoice, InvoiceAssembler};
pub use meter::{MeteredUsage, UsageMeter};
pub use period::{compute_period, BillingPeriod};
pub use tiered::{price_usage, ServiceTerms, TieredCharge};
