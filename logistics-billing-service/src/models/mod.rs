//! Domain models for logistics-billing-service.

mod contract;
mod invoice;
mod operations;
mod rate_table;
mod usage;

pub use contract::{BillingCadence, Contract, ContractServiceItem, ContractStatus, ServiceKind};
pub use invoice::{CreateInvoice, CreateLineItem, Invoice, InvoiceLineItem, InvoiceStatus};
pub use operations::{
    InboundReceipt, OutboundShipment, StorageUnit, RECEIPT_CONFIRMED, SHIPMENT_EXPEDITED,
};
pub use rate_table::{FreightQuote, RateBracket, RateTableRecord};
pub use usage::{InboundVolume, OutboundVolume, UsageCalculation};
