//! Invoice generation for one contract and its last completed period.

use crate::billing::{compute_period, price_usage, BillingPeriod, ServiceTerms, UsageMeter};
use crate::config::InvoicingConfig;
use crate::error::BillingError;
use crate::models::{Contract, CreateInvoice, Invoice, InvoiceLineItem, UsageCalculation};
use crate::services::{record_invoice_generated, InsertInvoiceOutcome, InvoiceStore};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Result of a successful generation run.
#[derive(Debug, Clone)]
pub struct GeneratedInvoice {
    pub invoice: Invoice,
    /// Priced usage per service item, in billing order.
    pub items: Vec<UsageCalculation>,
    pub line_items: Vec<InvoiceLineItem>,
}

#[derive(Clone)]
pub struct InvoiceAssembler {
    store: Arc<dyn InvoiceStore>,
    meter: UsageMeter,
    settings: InvoicingConfig,
}

impl InvoiceAssembler {
    pub fn new(store: Arc<dyn InvoiceStore>, meter: UsageMeter, settings: InvoicingConfig) -> Self {
        Self {
            store,
            meter,
            settings,
        }
    }

    /// Generate the invoice of `contract_id` for the period that closed before `now`.
    ///
    /// Fails with `DuplicatePeriod` when the contract already has an invoice for
    /// that period. The header and its line items are two separate writes; if
    /// the second one fails the header stays in place.
    #[instrument(skip_all, fields(contract_id = %contract_id))]
    pub async fn generate(
        &self,
        contract_id: &str,
        now: DateTime<Utc>,
    ) -> Result<GeneratedInvoice, BillingError> {
        let id = Uuid::parse_str(contract_id.trim())
            .map_err(|_| BillingError::ContractNotFound(contract_id.to_string()))?;
        let contract = self
            .store
            .get_contract(id)
            .await?
            .ok_or_else(|| BillingError::ContractNotFound(contract_id.to_string()))?;

        if !contract.is_active() {
            return Err(BillingError::InvalidRequest(
                "contract is not active".to_string(),
            ));
        }

        let period = compute_period(&contract.billing_cadence, now)?;
        let items = self.price_items(&contract, &period).await?;
        let service_amount: Decimal = items.iter().map(|c| c.amount).sum();

        if let Some(existing) = self
            .store
            .find_invoice_for_period(contract.contract_id, &period)
            .await?
        {
            return Err(BillingError::DuplicatePeriod {
                invoice_number: existing.invoice_number,
            });
        }

        let due_days = contract
            .due_days
            .map(i64::from)
            .unwrap_or(self.settings.default_due_days);
        let mut input = CreateInvoice {
            contract_id: contract.contract_id,
            invoice_number: String::new(),
            period_start: period.start,
            period_end: period.end,
            issue_date: now.date_naive(),
            due_date: period.end + Duration::days(due_days),
            service_amount,
            total_amount: service_amount,
            notes: Some(format!(
                "Automatically generated for period {} to {}",
                period.start, period.end
            )),
        };

        let invoice = self.insert_with_fresh_number(&mut input, &contract, &period, now).await?;

        let line_inputs: Vec<_> = items
            .iter()
            .enumerate()
            .map(|(i, calc)| calc.to_line_item(i as i32))
            .collect();
        let line_items = if line_inputs.is_empty() {
            Vec::new()
        } else {
            self.store
                .insert_line_items(invoice.invoice_id, &line_inputs)
                .await
                .inspect_err(|e| {
                    warn!(
                        invoice_number = %invoice.invoice_number,
                        error = %e,
                        "Line items not stored, invoice header remains"
                    );
                })?
        };

        record_invoice_generated(&contract.billing_cadence, invoice.total_amount);
        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            period_start = %period.start,
            period_end = %period.end,
            total_amount = %invoice.total_amount,
            items = items.len(),
            "Invoice generated"
        );

        Ok(GeneratedInvoice {
            invoice,
            items,
            line_items,
        })
    }

    /// Meter and price every active service item of the contract.
    async fn price_items(
        &self,
        contract: &Contract,
        period: &BillingPeriod,
    ) -> Result<Vec<UsageCalculation>, BillingError> {
        let service_items = self.store.get_service_items(contract.contract_id).await?;

        let mut calculations = Vec::with_capacity(service_items.len());
        for item in service_items.iter().filter(|i| i.is_active) {
            let terms = ServiceTerms::from_item(item)?;
            let usage = self.meter.meter(item, contract, period).await?;
            let charge = price_usage(usage.quantity_used, &terms);

            calculations.push(UsageCalculation {
                service_item_id: item.item_id,
                service_kind: item.service_kind.clone(),
                description: item.description.clone(),
                quantity_used: usage.quantity_used,
                quantity_included: terms.included_quantity(),
                quantity_minimum: terms.minimum_quantity(),
                quantity_billed: charge.quantity_billed,
                unit_price: terms.unit_price(),
                overage_price: terms.overage_price(),
                amount: charge.amount,
                computation_detail: usage.detail,
            });
        }

        Ok(calculations)
    }

    /// Insert the header, allocating the next number of the generation month.
    ///
    /// A number collision with a concurrent run recounts and retries; a period
    /// collision reports the invoice that won.
    async fn insert_with_fresh_number(
        &self,
        input: &mut CreateInvoice,
        contract: &Contract,
        period: &BillingPeriod,
        now: DateTime<Utc>,
    ) -> Result<Invoice, BillingError> {
        let month_prefix = format!("{}-{}-", self.settings.number_prefix, now.format("%Y%m"));
        let mut last_seq = 0;

        for attempt in 1..=self.settings.max_number_attempts {
            let issued = self.store.count_invoices_with_prefix(&month_prefix).await?;
            let seq = (issued + 1).max(last_seq + 1);
            last_seq = seq;
            input.invoice_number = format_invoice_number(&month_prefix, seq);

            match self.store.insert_invoice(input).await? {
                InsertInvoiceOutcome::Inserted(invoice) => return Ok(invoice),
                InsertInvoiceOutcome::NumberTaken => {
                    warn!(
                        invoice_number = %input.invoice_number,
                        attempt,
                        "Invoice number taken, retrying"
                    );
                }
                InsertInvoiceOutcome::PeriodTaken => {
                    let invoice_number = self
                        .store
                        .find_invoice_for_period(contract.contract_id, period)
                        .await?
                        .map(|i| i.invoice_number)
                        .unwrap_or_default();
                    return Err(BillingError::DuplicatePeriod { invoice_number });
                }
            }
        }

        Err(BillingError::InvoiceNumberExhausted(
            self.settings.max_number_attempts,
        ))
    }
}

fn format_invoice_number(month_prefix: &str, seq: i64) -> String {
    format!("{}{:03}", month_prefix, seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ContractServiceItem, InboundReceipt, OutboundShipment, RECEIPT_CONFIRMED,
        SHIPMENT_EXPEDITED,
    };
    use crate::models::CreateLineItem;
    use crate::services::InMemoryStore;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;
    use service_core::error::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn april_15() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 15, 9, 0, 0).unwrap()
    }

    fn contract(due_days: Option<i32>) -> Contract {
        Contract {
            contract_id: Uuid::new_v4(),
            payer_id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            billing_cadence: "monthly".to_string(),
            due_days,
            status: "active".to_string(),
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    fn item(c: &Contract, kind: &str, sort_order: i32) -> ContractServiceItem {
        ContractServiceItem {
            item_id: Uuid::new_v4(),
            contract_id: c.contract_id,
            service_kind: kind.to_string(),
            description: format!("{} handling", kind),
            included_quantity: Some(100),
            minimum_quantity: Some(20),
            unit_price: dec!(2.00),
            overage_unit_price: Some(dec!(3.00)),
            is_active: true,
            sort_order,
            created_utc: Utc::now(),
        }
    }

    async fn setup(c: &Contract) -> (Arc<InMemoryStore>, InvoiceAssembler) {
        let store = Arc::new(InMemoryStore::new());
        store.add_contract(c.clone()).await;
        let assembler = InvoiceAssembler::new(
            store.clone(),
            UsageMeter::new(store.clone()),
            InvoicingConfig::default(),
        );
        (store, assembler)
    }

    async fn receive(store: &InMemoryStore, c: &Contract, on: NaiveDate, units: i64) {
        store
            .add_inbound_receipt(InboundReceipt {
                receipt_id: Uuid::new_v4(),
                recipient_id: c.recipient_id,
                location_id: c.location_id,
                received_on: on,
                status: RECEIPT_CONFIRMED.to_string(),
                storage_units: units,
            })
            .await;
    }

    #[tokio::test]
    async fn test_generates_invoice_with_overage() {
        let c = contract(None);
        let (store, assembler) = setup(&c).await;
        store.add_service_item(item(&c, "inbound_unit", 0)).await;
        receive(&store, &c, date(2026, 3, 3), 80).await;
        receive(&store, &c, date(2026, 3, 28), 50).await;

        let generated = assembler
            .generate(&c.contract_id.to_string(), april_15())
            .await
            .unwrap();

        let invoice = &generated.invoice;
        assert_eq!(invoice.invoice_number, "FAT-202604-001");
        assert_eq!(invoice.period_start, date(2026, 3, 1));
        assert_eq!(invoice.period_end, date(2026, 3, 31));
        assert_eq!(invoice.issue_date, date(2026, 4, 15));
        assert_eq!(invoice.due_date, date(2026, 4, 10));
        assert_eq!(invoice.service_amount, dec!(290.00));
        assert_eq!(invoice.total_amount, dec!(290.00));
        assert_eq!(invoice.status, "pending");
        assert_eq!(
            invoice.notes.as_deref(),
            Some("Automatically generated for period 2026-03-01 to 2026-03-31")
        );

        assert_eq!(generated.items.len(), 1);
        assert_eq!(generated.items[0].quantity_used, 130);
        assert_eq!(generated.items[0].quantity_billed, 130);
        assert_eq!(generated.line_items.len(), 1);
        assert_eq!(store.line_items().await[0].amount, dec!(290.00));
    }

    #[tokio::test]
    async fn test_sums_items_in_sort_order_and_skips_inactive() {
        let c = contract(Some(5));
        let (store, assembler) = setup(&c).await;
        store.add_service_item(item(&c, "outbound_unit", 2)).await;
        store.add_service_item(item(&c, "inbound_unit", 1)).await;
        let mut retired = item(&c, "storage_unit_day", 0);
        retired.is_active = false;
        store.add_service_item(retired).await;

        receive(&store, &c, date(2026, 3, 10), 10).await;
        store
            .add_outbound_shipment(OutboundShipment {
                shipment_id: Uuid::new_v4(),
                recipient_id: c.recipient_id,
                location_id: c.location_id,
                dispatched_on: date(2026, 3, 20),
                status: SHIPMENT_EXPEDITED.to_string(),
                line_items: 110,
            })
            .await;

        let generated = assembler
            .generate(&c.contract_id.to_string(), april_15())
            .await
            .unwrap();

        let kinds: Vec<_> = generated.items.iter().map(|i| i.service_kind.as_str()).collect();
        assert_eq!(kinds, vec!["inbound_unit", "outbound_unit"]);
        // inbound floors to the minimum (20 x 2.00), outbound has 10 over (200 + 30)
        assert_eq!(generated.invoice.service_amount, dec!(270.00));
        assert_eq!(generated.invoice.due_date, date(2026, 4, 5));
        assert_eq!(generated.line_items[1].sort_order, 1);
    }

    #[tokio::test]
    async fn test_second_run_for_same_period_is_rejected() {
        let c = contract(None);
        let (store, assembler) = setup(&c).await;
        store.add_service_item(item(&c, "inbound_unit", 0)).await;

        let first = assembler
            .generate(&c.contract_id.to_string(), april_15())
            .await
            .unwrap();
        let err = assembler
            .generate(&c.contract_id.to_string(), april_15())
            .await
            .unwrap_err();

        match err {
            BillingError::DuplicatePeriod { invoice_number } => {
                assert_eq!(invoice_number, first.invoice.invoice_number)
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.invoices().await.len(), 1);
    }

    #[tokio::test]
    async fn test_numbers_follow_issued_count_of_month() {
        let store = Arc::new(InMemoryStore::new());
        let assembler = InvoiceAssembler::new(
            store.clone(),
            UsageMeter::new(store.clone()),
            InvoicingConfig::default(),
        );

        let mut numbers = Vec::new();
        for _ in 0..3 {
            let c = contract(None);
            store.add_contract(c.clone()).await;
            let generated = assembler
                .generate(&c.contract_id.to_string(), april_15())
                .await
                .unwrap();
            numbers.push(generated.invoice.invoice_number);
        }

        assert_eq!(numbers, vec!["FAT-202604-001", "FAT-202604-002", "FAT-202604-003"]);
    }

    #[tokio::test]
    async fn test_number_collision_moves_to_next_sequence() {
        let c = contract(None);
        let (store, assembler) = setup(&c).await;

        // -001 is gone, so the month count of one points at the taken -002.
        let squatter = contract(None);
        store
            .insert_invoice(&CreateInvoice {
                contract_id: squatter.contract_id,
                invoice_number: "FAT-202604-002".to_string(),
                period_start: date(2025, 1, 1),
                period_end: date(2025, 1, 31),
                issue_date: date(2025, 2, 1),
                due_date: date(2025, 2, 10),
                service_amount: dec!(0),
                total_amount: dec!(0),
                notes: None,
            })
            .await
            .unwrap();

        let generated = assembler
            .generate(&c.contract_id.to_string(), april_15())
            .await
            .unwrap();

        assert_eq!(generated.invoice.invoice_number, "FAT-202604-003");
    }

    #[tokio::test]
    async fn test_unknown_kind_bills_minimum_of_zero_usage() {
        let c = contract(None);
        let (store, assembler) = setup(&c).await;
        store.add_service_item(item(&c, "cross_docking", 0)).await;

        let generated = assembler
            .generate(&c.contract_id.to_string(), april_15())
            .await
            .unwrap();

        let calc = &generated.items[0];
        assert_eq!(calc.quantity_used, 0);
        assert_eq!(calc.quantity_billed, 20);
        assert_eq!(calc.computation_detail, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_minimum_without_included_quantity() {
        let c = contract(None);
        let (store, assembler) = setup(&c).await;
        let mut idle = item(&c, "outbound_unit", 0);
        idle.included_quantity = None;
        idle.overage_unit_price = None;
        store.add_service_item(idle).await;
        let mut busy = item(&c, "inbound_unit", 1);
        busy.included_quantity = None;
        busy.overage_unit_price = None;
        store.add_service_item(busy).await;
        receive(&store, &c, date(2026, 3, 12), 5).await;

        let generated = assembler
            .generate(&c.contract_id.to_string(), april_15())
            .await
            .unwrap();

        assert_eq!(generated.items[0].quantity_billed, 20);
        assert_eq!(generated.items[0].amount, dec!(40.00));
        assert_eq!(generated.items[1].quantity_billed, 5);
        assert_eq!(generated.items[1].amount, dec!(10.00));
        assert_eq!(generated.invoice.total_amount, dec!(50.00));
    }

    #[tokio::test]
    async fn test_line_item_failure_keeps_header() {
        let c = contract(None);
        let (store, assembler) = setup(&c).await;
        store.add_service_item(item(&c, "inbound_unit", 0)).await;
        store.fail_line_item_inserts(true).await;

        let err = assembler
            .generate(&c.contract_id.to_string(), april_15())
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Storage(_)));
        assert_eq!(store.invoices().await.len(), 1);
        assert!(store.line_items().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_contract() {
        let c = contract(None);
        let (_, assembler) = setup(&c).await;

        let missing = Uuid::new_v4().to_string();
        assert!(matches!(
            assembler.generate(&missing, april_15()).await,
            Err(BillingError::ContractNotFound(id)) if id == missing
        ));
        assert!(matches!(
            assembler.generate("not-a-uuid", april_15()).await,
            Err(BillingError::ContractNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_inactive_contract_is_rejected() {
        let mut c = contract(None);
        c.status = "suspended".to_string();
        let (store, assembler) = setup(&c).await;

        let err = assembler
            .generate(&c.contract_id.to_string(), april_15())
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::InvalidRequest(_)));
        assert!(store.invoices().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_cadence_fails_before_writing() {
        let mut c = contract(None);
        c.billing_cadence = "quarterly".to_string();
        let (store, assembler) = setup(&c).await;

        let err = assembler
            .generate(&c.contract_id.to_string(), april_15())
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::InvalidCadence(_)));
        assert!(store.invoices().await.is_empty());
    }

    /// Store that loses races against a concurrent generation run.
    struct ContendedStore {
        inner: Arc<InMemoryStore>,
        hidden_period_lookups: AtomicU32,
        numbers_to_reject: AtomicU32,
        tried_numbers: Mutex<Vec<String>>,
    }

    impl ContendedStore {
        fn new(inner: Arc<InMemoryStore>, hidden_period_lookups: u32, numbers_to_reject: u32) -> Self {
            Self {
                inner,
                hidden_period_lookups: AtomicU32::new(hidden_period_lookups),
                numbers_to_reject: AtomicU32::new(numbers_to_reject),
                tried_numbers: Mutex::new(Vec::new()),
            }
        }

        fn tried_numbers(&self) -> Vec<String> {
            self.tried_numbers.lock().unwrap().clone()
        }
    }

    fn take_one(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    #[async_trait]
    impl InvoiceStore for ContendedStore {
        async fn get_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, AppError> {
            self.inner.get_contract(contract_id).await
        }

        async fn get_service_items(
            &self,
            contract_id: Uuid,
        ) -> Result<Vec<ContractServiceItem>, AppError> {
            self.inner.get_service_items(contract_id).await
        }

        async fn find_invoice_for_period(
            &self,
            contract_id: Uuid,
            period: &BillingPeriod,
        ) -> Result<Option<Invoice>, AppError> {
            if take_one(&self.hidden_period_lookups) {
                return Ok(None);
            }
            self.inner.find_invoice_for_period(contract_id, period).await
        }

        async fn count_invoices_with_prefix(&self, prefix: &str) -> Result<i64, AppError> {
            self.inner.count_invoices_with_prefix(prefix).await
        }

        async fn insert_invoice(
            &self,
            input: &CreateInvoice,
        ) -> Result<InsertInvoiceOutcome, AppError> {
            self.tried_numbers
                .lock()
                .unwrap()
                .push(input.invoice_number.clone());
            if take_one(&self.numbers_to_reject) {
                return Ok(InsertInvoiceOutcome::NumberTaken);
            }
            self.inner.insert_invoice(input).await
        }

        async fn insert_line_items(
            &self,
            invoice_id: Uuid,
            items: &[CreateLineItem],
        ) -> Result<Vec<InvoiceLineItem>, AppError> {
            self.inner.insert_line_items(invoice_id, items).await
        }

        async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
            self.inner.get_invoice(invoice_id).await
        }

        async fn get_line_items(
            &self,
            invoice_id: Uuid,
        ) -> Result<Vec<InvoiceLineItem>, AppError> {
            self.inner.get_line_items(invoice_id).await
        }
    }

    fn contended_assembler(store: Arc<ContendedStore>) -> InvoiceAssembler {
        let meter = UsageMeter::new(store.inner.clone());
        InvoiceAssembler::new(store, meter, InvoicingConfig::default())
    }

    #[tokio::test]
    async fn test_period_won_by_concurrent_run_reports_its_number() {
        let c = contract(None);
        let inner = Arc::new(InMemoryStore::new());
        inner.add_contract(c.clone()).await;
        inner.add_service_item(item(&c, "inbound_unit", 0)).await;
        inner
            .insert_invoice(&CreateInvoice {
                contract_id: c.contract_id,
                invoice_number: "FAT-202604-001".to_string(),
                period_start: date(2026, 3, 1),
                period_end: date(2026, 3, 31),
                issue_date: date(2026, 4, 15),
                due_date: date(2026, 4, 10),
                service_amount: dec!(40.00),
                total_amount: dec!(40.00),
                notes: None,
            })
            .await
            .unwrap();

        // The lookup before the insert misses the winner, the constraint does not.
        let store = Arc::new(ContendedStore::new(inner.clone(), 1, 0));
        let err = contended_assembler(store.clone())
            .generate(&c.contract_id.to_string(), april_15())
            .await
            .unwrap_err();

        match err {
            BillingError::DuplicatePeriod { invoice_number } => {
                assert_eq!(invoice_number, "FAT-202604-001")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.tried_numbers(), vec!["FAT-202604-002"]);
        assert_eq!(inner.invoices().await.len(), 1);
        assert!(inner.line_items().await.is_empty());
    }

    #[tokio::test]
    async fn test_taken_number_is_retried_with_next_sequence() {
        let c = contract(None);
        let inner = Arc::new(InMemoryStore::new());
        inner.add_contract(c.clone()).await;

        let store = Arc::new(ContendedStore::new(inner.clone(), 0, 1));
        let generated = contended_assembler(store.clone())
            .generate(&c.contract_id.to_string(), april_15())
            .await
            .unwrap();

        assert_eq!(generated.invoice.invoice_number, "FAT-202604-002");
        assert_eq!(store.tried_numbers(), vec!["FAT-202604-001", "FAT-202604-002"]);
    }

    #[tokio::test]
    async fn test_number_allocation_gives_up_after_max_attempts() {
        let c = contract(None);
        let inner = Arc::new(InMemoryStore::new());
        inner.add_contract(c.clone()).await;

        let store = Arc::new(ContendedStore::new(inner.clone(), 0, u32::MAX));
        let err = contended_assembler(store.clone())
            .generate(&c.contract_id.to_string(), april_15())
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::InvoiceNumberExhausted(3)));
        assert_eq!(
            store.tried_numbers(),
            vec!["FAT-202604-001", "FAT-202604-002", "FAT-202604-003"]
        );
        assert!(inner.invoices().await.is_empty());
    }

    #[test]
    fn test_format_invoice_number_pads_to_three_digits() {
        assert_eq!(format_invoice_number("FAT-202603-", 4), "FAT-202603-004");
        assert_eq!(format_invoice_number("FAT-202603-", 1234), "FAT-202603-1234");
    }
}
