//! Database service for logistics-billing-service.

use crate::billing::BillingPeriod;
use crate::models::{
    Contract, ContractServiceItem, CreateInvoice, CreateLineItem, InboundVolume, Invoice,
    InvoiceLineItem, InvoiceStatus, OutboundVolume, RateBracket, RateTableRecord,
    RECEIPT_CONFIRMED, SHIPMENT_EXPEDITED,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{
    InsertInvoiceOutcome, InvoiceStore, RateTableStore, StoreHealth, UsageSource,
};
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const INVOICE_NUMBER_CONSTRAINT: &str = "invoices_invoice_number_key";
const INVOICE_PERIOD_CONSTRAINT: &str = "invoices_contract_period_key";

const INVOICE_COLUMNS: &str = "invoice_id, contract_id, invoice_number, period_start, period_end, issue_date, due_date, service_amount, total_amount, status, notes, created_utc";
const LINE_ITEM_COLUMNS: &str = "line_item_id, invoice_id, service_item_id, service_kind, description, quantity_used, quantity_included, quantity_minimum, quantity_billed, unit_price, overage_price, amount, computation_detail, sort_order, created_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "logistics-billing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

/// Name of the unique constraint a failed insert ran into, if any.
fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

#[async_trait]
impl InvoiceStore for Database {
    #[instrument(skip(self))]
    async fn get_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_contract"])
            .start_timer();

        let contract = sqlx::query_as::<_, Contract>(
            r#"
            SELECT contract_id, payer_id, recipient_id, location_id, billing_cadence, due_days, status, created_utc, updated_utc
            FROM contracts
            WHERE contract_id = $1
            "#,
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get contract: {}", e)))?;

        timer.observe_duration();

        Ok(contract)
    }

    #[instrument(skip(self))]
    async fn get_service_items(
        &self,
        contract_id: Uuid,
    ) -> Result<Vec<ContractServiceItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_service_items"])
            .start_timer();

        let items = sqlx::query_as::<_, ContractServiceItem>(
            r#"
            SELECT item_id, contract_id, service_kind, description, included_quantity, minimum_quantity, unit_price, overage_unit_price, is_active, sort_order, created_utc
            FROM contract_service_items
            WHERE contract_id = $1
            ORDER BY sort_order, created_utc
            "#,
        )
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get service items: {}", e))
        })?;

        timer.observe_duration();

        Ok(items)
    }

    #[instrument(skip(self, period), fields(period_start = %period.start, period_end = %period.end))]
    async fn find_invoice_for_period(
        &self,
        contract_id: Uuid,
        period: &BillingPeriod,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_invoice_for_period"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices WHERE contract_id = $1 AND period_start = $2 AND period_end = $3",
            INVOICE_COLUMNS
        ))
        .bind(contract_id)
        .bind(period.start)
        .bind(period.end)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to find invoice for period: {}", e))
        })?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self))]
    async fn count_invoices_with_prefix(&self, prefix: &str) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_invoices_with_prefix"])
            .start_timer();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM invoices WHERE LEFT(invoice_number, LENGTH($1)) = $1",
        )
        .bind(prefix)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count invoices: {}", e)))?;

        timer.observe_duration();

        Ok(count)
    }

    #[instrument(skip(self, input), fields(contract_id = %input.contract_id, invoice_number = %input.invoice_number))]
    async fn insert_invoice(
        &self,
        input: &CreateInvoice,
    ) -> Result<InsertInvoiceOutcome, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice"])
            .start_timer();

        let result = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (invoice_id, contract_id, invoice_number, period_start, period_end, issue_date, due_date, service_amount, total_amount, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.contract_id)
        .bind(&input.invoice_number)
        .bind(input.period_start)
        .bind(input.period_end)
        .bind(input.issue_date)
        .bind(input.due_date)
        .bind(input.service_amount)
        .bind(input.total_amount)
        .bind(InvoiceStatus::Pending.as_str())
        .bind(&input.notes)
        .fetch_one(&self.pool)
        .await;

        timer.observe_duration();

        match result {
            Ok(invoice) => Ok(InsertInvoiceOutcome::Inserted(invoice)),
            Err(e) => match unique_violation(&e).as_deref() {
                Some(INVOICE_NUMBER_CONSTRAINT) => Ok(InsertInvoiceOutcome::NumberTaken),
                Some(INVOICE_PERIOD_CONSTRAINT) => Ok(InsertInvoiceOutcome::PeriodTaken),
                _ => Err(AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to insert invoice: {}",
                    e
                ))),
            },
        }
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn insert_line_items(
        &self,
        invoice_id: Uuid,
        items: &[CreateLineItem],
    ) -> Result<Vec<InvoiceLineItem>, AppError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_line_items"])
            .start_timer();

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO invoice_line_items (line_item_id, invoice_id, service_item_id, service_kind, description, quantity_used, quantity_included, quantity_minimum, quantity_billed, unit_price, overage_price, amount, computation_detail, sort_order) ",
        );
        builder.push_values(items, |mut row, item| {
            row.push_bind(Uuid::new_v4())
                .push_bind(invoice_id)
                .push_bind(item.service_item_id)
                .push_bind(&item.service_kind)
                .push_bind(&item.description)
                .push_bind(item.quantity_used)
                .push_bind(item.quantity_included)
                .push_bind(item.quantity_minimum)
                .push_bind(item.quantity_billed)
                .push_bind(item.unit_price)
                .push_bind(item.overage_price)
                .push_bind(item.amount)
                .push_bind(&item.computation_detail)
                .push_bind(item.sort_order);
        });
        builder.push(" RETURNING ");
        builder.push(LINE_ITEM_COLUMNS);

        let mut created = builder
            .build_query_as::<InvoiceLineItem>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert line items: {}", e))
            })?;
        created.sort_by_key(|l| l.sort_order);

        timer.observe_duration();

        Ok(created)
    }

    #[instrument(skip(self))]
    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices WHERE invoice_id = $1",
            INVOICE_COLUMNS
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self))]
    async fn get_line_items(&self, invoice_id: Uuid) -> Result<Vec<InvoiceLineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_line_items"])
            .start_timer();

        let items = sqlx::query_as::<_, InvoiceLineItem>(&format!(
            "SELECT {} FROM invoice_line_items WHERE invoice_id = $1 ORDER BY sort_order",
            LINE_ITEM_COLUMNS
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

        timer.observe_duration();

        Ok(items)
    }
}

#[async_trait]
impl UsageSource for Database {
    #[instrument(skip(self, period), fields(period_start = %period.start, period_end = %period.end))]
    async fn inbound_volume(
        &self,
        recipient_id: Uuid,
        location_id: Uuid,
        period: &BillingPeriod,
    ) -> Result<InboundVolume, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["inbound_volume"])
            .start_timer();

        let (receipts, units): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT r.receipt_id), COUNT(u.unit_id)
            FROM inbound_receipts r
            LEFT JOIN receipt_units u ON u.receipt_id = r.receipt_id
            WHERE r.recipient_id = $1
              AND r.location_id = $2
              AND r.status = $3
              AND r.received_on BETWEEN $4 AND $5
            "#,
        )
        .bind(recipient_id)
        .bind(location_id)
        .bind(RECEIPT_CONFIRMED)
        .bind(period.start)
        .bind(period.end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to meter inbound volume: {}", e))
        })?;

        timer.observe_duration();

        Ok(InboundVolume { receipts, units })
    }

    #[instrument(skip(self, period), fields(period_start = %period.start, period_end = %period.end))]
    async fn outbound_volume(
        &self,
        recipient_id: Uuid,
        location_id: Uuid,
        period: &BillingPeriod,
    ) -> Result<OutboundVolume, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["outbound_volume"])
            .start_timer();

        let (shipments, line_items): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT s.shipment_id), COUNT(i.shipment_item_id)
            FROM outbound_shipments s
            LEFT JOIN shipment_items i ON i.shipment_id = s.shipment_id
            WHERE s.recipient_id = $1
              AND s.location_id = $2
              AND s.status = $3
              AND s.dispatched_on BETWEEN $4 AND $5
            "#,
        )
        .bind(recipient_id)
        .bind(location_id)
        .bind(SHIPMENT_EXPEDITED)
        .bind(period.start)
        .bind(period.end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to meter outbound volume: {}", e))
        })?;

        timer.observe_duration();

        Ok(OutboundVolume {
            shipments,
            line_items,
        })
    }

    #[instrument(skip(self))]
    async fn occupied_storage_units(
        &self,
        recipient_id: Uuid,
        location_id: Uuid,
    ) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["occupied_storage_units"])
            .start_timer();

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM storage_units
            WHERE recipient_id = $1 AND location_id = $2 AND remaining_quantity > 0
            "#,
        )
        .bind(recipient_id)
        .bind(location_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to count storage units: {}", e))
        })?;

        timer.observe_duration();

        Ok(count)
    }
}

#[async_trait]
impl RateTableStore for Database {
    #[instrument(skip(self))]
    async fn get_rate_table(&self, table_id: Uuid) -> Result<Option<RateTableRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_rate_table"])
            .start_timer();

        let table = sqlx::query_as::<_, RateTableRecord>(
            r#"
            SELECT table_id, payer_id, transporter_id, name, is_active, created_utc
            FROM rate_tables
            WHERE table_id = $1
            "#,
        )
        .bind(table_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get rate table: {}", e)))?;

        timer.observe_duration();

        Ok(table)
    }

    #[instrument(skip(self))]
    async fn active_rate_tables(&self, payer_id: Uuid) -> Result<Vec<RateTableRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["active_rate_tables"])
            .start_timer();

        let tables = sqlx::query_as::<_, RateTableRecord>(
            r#"
            SELECT table_id, payer_id, transporter_id, name, is_active, created_utc
            FROM rate_tables
            WHERE payer_id = $1 AND is_active = TRUE
            ORDER BY created_utc, table_id
            "#,
        )
        .bind(payer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list rate tables: {}", e))
        })?;

        timer.observe_duration();

        Ok(tables)
    }

    #[instrument(skip(self))]
    async fn get_brackets(&self, table_id: Uuid) -> Result<Vec<RateBracket>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_brackets"])
            .start_timer();

        let brackets = sqlx::query_as::<_, RateBracket>(
            r#"
            SELECT bracket_id, table_id, distance_min, distance_max, value_up_to_300kg, value_per_kg_above_300, toll_per_ton, lead_time_days
            FROM rate_brackets
            WHERE table_id = $1
            ORDER BY distance_min
            "#,
        )
        .bind(table_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get brackets: {}", e)))?;

        timer.observe_duration();

        Ok(brackets)
    }
}

#[async_trait]
impl StoreHealth for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }
}
