//! Storage abstractions consumed by the billing and freight engines.
//!
//! The engines only see these traits; `Database` implements them over
//! PostgreSQL and `InMemoryStore` implements them for tests and demos.

use crate::billing::BillingPeriod;
use crate::models::{
    Contract, ContractServiceItem, CreateInvoice, CreateLineItem, InboundVolume, Invoice,
    InvoiceLineItem, OutboundVolume, RateBracket, RateTableRecord,
};
use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

/// Outcome of an invoice header insert.
#[derive(Debug, Clone)]
pub enum InsertInvoiceOutcome {
    Inserted(Invoice),
    /// Another invoice already covers this contract and period.
    PeriodTaken,
    /// The invoice number was taken by a concurrent generation.
    NumberTaken,
}

/// Contract reads and invoice writes.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn get_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, AppError>;

    /// Service items of a contract, in billing order.
    async fn get_service_items(
        &self,
        contract_id: Uuid,
    ) -> Result<Vec<ContractServiceItem>, AppError>;

    async fn find_invoice_for_period(
        &self,
        contract_id: Uuid,
        period: &BillingPeriod,
    ) -> Result<Option<Invoice>, AppError>;

    /// Number of invoices whose number starts with `prefix`.
    async fn count_invoices_with_prefix(&self, prefix: &str) -> Result<i64, AppError>;

    async fn insert_invoice(&self, input: &CreateInvoice)
        -> Result<InsertInvoiceOutcome, AppError>;

    async fn insert_line_items(
        &self,
        invoice_id: Uuid,
        items: &[CreateLineItem],
    ) -> Result<Vec<InvoiceLineItem>, AppError>;

    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError>;

    async fn get_line_items(&self, invoice_id: Uuid) -> Result<Vec<InvoiceLineItem>, AppError>;
}

/// Operational volumes recorded by receiving, dispatch and storage.
#[async_trait]
pub trait UsageSource: Send + Sync {
    /// Confirmed inbound receipts received within `period`.
    async fn inbound_volume(
        &self,
        recipient_id: Uuid,
        location_id: Uuid,
        period: &BillingPeriod,
    ) -> Result<InboundVolume, AppError>;

    /// Dispatched (`expedited`) outbound shipments within `period`.
    async fn outbound_volume(
        &self,
        recipient_id: Uuid,
        location_id: Uuid,
        period: &BillingPeriod,
    ) -> Result<OutboundVolume, AppError>;

    /// Storage units currently holding a positive remaining quantity.
    async fn occupied_storage_units(
        &self,
        recipient_id: Uuid,
        location_id: Uuid,
    ) -> Result<i64, AppError>;
}

/// Read-only access to freight rate tables.
#[async_trait]
pub trait RateTableStore: Send + Sync {
    async fn get_rate_table(&self, table_id: Uuid) -> Result<Option<RateTableRecord>, AppError>;

    /// Active tables of a payer, in their stored order.
    async fn active_rate_tables(&self, payer_id: Uuid) -> Result<Vec<RateTableRecord>, AppError>;

    async fn get_brackets(&self, table_id: Uuid) -> Result<Vec<RateBracket>, AppError>;
}

/// Liveness probe of the backing store.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;
}
