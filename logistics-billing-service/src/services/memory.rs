//! In-memory store for tests and local demos.

use crate::billing::BillingPeriod;
use crate::models::{
    Contract, ContractServiceItem, CreateInvoice, CreateLineItem, InboundReceipt, InboundVolume,
    Invoice, InvoiceLineItem, InvoiceStatus, OutboundShipment, OutboundVolume, RateBracket,
    RateTableRecord, StorageUnit, RECEIPT_CONFIRMED, SHIPMENT_EXPEDITED,
};
use crate::services::store::{
    InsertInvoiceOutcome, InvoiceStore, RateTableStore, StoreHealth, UsageSource,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    contracts: Vec<Contract>,
    service_items: Vec<ContractServiceItem>,
    invoices: Vec<Invoice>,
    line_items: Vec<InvoiceLineItem>,
    receipts: Vec<InboundReceipt>,
    shipments: Vec<OutboundShipment>,
    storage_units: Vec<StorageUnit>,
    rate_tables: Vec<RateTableRecord>,
    brackets: Vec<RateBracket>,
    fail_line_items: bool,
}

/// Store holding every record in process memory.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_contract(&self, contract: Contract) {
        self.state.write().await.contracts.push(contract);
    }

    pub async fn add_service_item(&self, item: ContractServiceItem) {
        self.state.write().await.service_items.push(item);
    }

    pub async fn add_inbound_receipt(&self, receipt: InboundReceipt) {
        self.state.write().await.receipts.push(receipt);
    }

    pub async fn add_outbound_shipment(&self, shipment: OutboundShipment) {
        self.state.write().await.shipments.push(shipment);
    }

    pub async fn add_storage_unit(&self, unit: StorageUnit) {
        self.state.write().await.storage_units.push(unit);
    }

    pub async fn add_rate_table(&self, table: RateTableRecord, brackets: Vec<RateBracket>) {
        let mut state = self.state.write().await;
        state.rate_tables.push(table);
        state.brackets.extend(brackets);
    }

    /// Make subsequent line item inserts fail, leaving written headers in place.
    pub async fn fail_line_item_inserts(&self, fail: bool) {
        self.state.write().await.fail_line_items = fail;
    }

    pub async fn invoices(&self) -> Vec<Invoice> {
        self.state.read().await.invoices.clone()
    }

    pub async fn line_items(&self) -> Vec<InvoiceLineItem> {
        self.state.read().await.line_items.clone()
    }
}

#[async_trait]
impl InvoiceStore for InMemoryStore {
    async fn get_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .contracts
            .iter()
            .find(|c| c.contract_id == contract_id)
            .cloned())
    }

    async fn get_service_items(
        &self,
        contract_id: Uuid,
    ) -> Result<Vec<ContractServiceItem>, AppError> {
        let state = self.state.read().await;
        let mut items: Vec<ContractServiceItem> = state
            .service_items
            .iter()
            .filter(|i| i.contract_id == contract_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then(a.created_utc.cmp(&b.created_utc))
        });
        Ok(items)
    }

    async fn find_invoice_for_period(
        &self,
        contract_id: Uuid,
        period: &BillingPeriod,
    ) -> Result<Option<Invoice>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .invoices
            .iter()
            .find(|i| {
                i.contract_id == contract_id
                    && i.period_start == period.start
                    && i.period_end == period.end
            })
            .cloned())
    }

    async fn count_invoices_with_prefix(&self, prefix: &str) -> Result<i64, AppError> {
        let state = self.state.read().await;
        Ok(state
            .invoices
            .iter()
            .filter(|i| i.invoice_number.starts_with(prefix))
            .count() as i64)
    }

    async fn insert_invoice(
        &self,
        input: &CreateInvoice,
    ) -> Result<InsertInvoiceOutcome, AppError> {
        let mut state = self.state.write().await;

        if state.invoices.iter().any(|i| {
            i.contract_id == input.contract_id
                && i.period_start == input.period_start
                && i.period_end == input.period_end
        }) {
            return Ok(InsertInvoiceOutcome::PeriodTaken);
        }
        if state
            .invoices
            .iter()
            .any(|i| i.invoice_number == input.invoice_number)
        {
            return Ok(InsertInvoiceOutcome::NumberTaken);
        }

        let invoice = Invoice {
            invoice_id: Uuid::new_v4(),
            contract_id: input.contract_id,
            invoice_number: input.invoice_number.clone(),
            period_start: input.period_start,
            period_end: input.period_end,
            issue_date: input.issue_date,
            due_date: input.due_date,
            service_amount: input.service_amount,
            total_amount: input.total_amount,
            status: InvoiceStatus::Pending.as_str().to_string(),
            notes: input.notes.clone(),
            created_utc: Utc::now(),
        };
        state.invoices.push(invoice.clone());

        Ok(InsertInvoiceOutcome::Inserted(invoice))
    }

    async fn insert_line_items(
        &self,
        invoice_id: Uuid,
        items: &[CreateLineItem],
    ) -> Result<Vec<InvoiceLineItem>, AppError> {
        let mut state = self.state.write().await;
        if state.fail_line_items {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Failed to insert line items: simulated failure"
            )));
        }

        let now = Utc::now();
        let created: Vec<InvoiceLineItem> = items
            .iter()
            .map(|item| InvoiceLineItem {
                line_item_id: Uuid::new_v4(),
                invoice_id,
                service_item_id: item.service_item_id,
                service_kind: item.service_kind.clone(),
                description: item.description.clone(),
                quantity_used: item.quantity_used,
                quantity_included: item.quantity_included,
                quantity_minimum: item.quantity_minimum,
                quantity_billed: item.quantity_billed,
                unit_price: item.unit_price,
                overage_price: item.overage_price,
                amount: item.amount,
                computation_detail: item.computation_detail.clone(),
                sort_order: item.sort_order,
                created_utc: now,
            })
            .collect();
        state.line_items.extend(created.iter().cloned());

        Ok(created)
    }

    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .invoices
            .iter()
            .find(|i| i.invoice_id == invoice_id)
            .cloned())
    }

    async fn get_line_items(&self, invoice_id: Uuid) -> Result<Vec<InvoiceLineItem>, AppError> {
        let state = self.state.read().await;
        let mut items: Vec<InvoiceLineItem> = state
            .line_items
            .iter()
            .filter(|l| l.invoice_id == invoice_id)
            .cloned()
            .collect();
        items.sort_by_key(|l| l.sort_order);
        Ok(items)
    }
}

#[async_trait]
impl UsageSource for InMemoryStore {
    async fn inbound_volume(
        &self,
        recipient_id: Uuid,
        location_id: Uuid,
        period: &BillingPeriod,
    ) -> Result<InboundVolume, AppError> {
        let state = self.state.read().await;
        Ok(state
            .receipts
            .iter()
            .filter(|r| {
                r.recipient_id == recipient_id
                    && r.location_id == location_id
                    && r.status == RECEIPT_CONFIRMED
                    && period.contains(r.received_on)
            })
            .fold(InboundVolume::default(), |acc, r| InboundVolume {
                receipts: acc.receipts + 1,
                units: acc.units + r.storage_units,
            }))
    }

    async fn outbound_volume(
        &self,
        recipient_id: Uuid,
        location_id: Uuid,
        period: &BillingPeriod,
    ) -> Result<OutboundVolume, AppError> {
        let state = self.state.read().await;
        Ok(state
            .shipments
            .iter()
            .filter(|s| {
                s.recipient_id == recipient_id
                    && s.location_id == location_id
                    && s.status == SHIPMENT_EXPEDITED
                    && period.contains(s.dispatched_on)
            })
            .fold(OutboundVolume::default(), |acc, s| OutboundVolume {
                shipments: acc.shipments + 1,
                line_items: acc.line_items + s.line_items,
            }))
    }

    async fn occupied_storage_units(
        &self,
        recipient_id: Uuid,
        location_id: Uuid,
    ) -> Result<i64, AppError> {
        let state = self.state.read().await;
        Ok(state
            .storage_units
            .iter()
            .filter(|u| {
                u.recipient_id == recipient_id
                    && u.location_id == location_id
                    && u.remaining_quantity > Decimal::ZERO
            })
            .count() as i64)
    }
}

#[async_trait]
impl RateTableStore for InMemoryStore {
    async fn get_rate_table(&self, table_id: Uuid) -> Result<Option<RateTableRecord>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .rate_tables
            .iter()
            .find(|t| t.table_id == table_id)
            .cloned())
    }

    async fn active_rate_tables(&self, payer_id: Uuid) -> Result<Vec<RateTableRecord>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .rate_tables
            .iter()
            .filter(|t| t.payer_id == payer_id && t.is_active)
            .cloned()
            .collect())
    }

    async fn get_brackets(&self, table_id: Uuid) -> Result<Vec<RateBracket>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .brackets
            .iter()
            .filter(|b| b.table_id == table_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
