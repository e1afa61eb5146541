//! Test helper module for logistics-billing-service integration tests.
//!
//! Spawns the HTTP service over an in-memory store seeded per test.

#![allow(dead_code)]

use chrono::Utc;
use logistics_billing_service::billing::{compute_period, BillingPeriod};
use logistics_billing_service::config::{BillingConfig, DatabaseConfig, InvoicingConfig};
use logistics_billing_service::models::{
    Contract, ContractServiceItem, InboundReceipt, OutboundShipment, RateBracket,
    RateTableRecord, StorageUnit, RECEIPT_CONFIRMED, SHIPMENT_EXPEDITED,
};
use logistics_billing_service::services::InMemoryStore;
use logistics_billing_service::startup::Application;
use rust_decimal::Decimal;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use uuid::Uuid;

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub http_address: String,
    pub http_port: u16,
    pub store: Arc<InMemoryStore>,
    pub client: reqwest::Client,
}

pub fn test_config() -> BillingConfig {
    BillingConfig {
        common: CoreConfig { port: 0 }, // Random port
        service_name: "logistics-billing-service-test".to_string(),
        log_level: "warn".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        invoicing: InvoicingConfig::default(),
    }
}

impl TestApp {
    /// Spawn a new test application on a random port.
    pub async fn spawn() -> Self {
        let store = Arc::new(InMemoryStore::new());

        let app = Application::build_with_store(test_config(), store.clone())
            .await
            .expect("Failed to build test application");

        let http_port = app.http_port();
        let http_address = format!("http://127.0.0.1:{}", http_port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", http_address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            http_address,
            http_port,
            store,
            client,
        }
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.http_address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.http_address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Seed an active monthly contract.
    pub async fn seed_contract(&self, due_days: Option<i32>) -> Contract {
        self.seed_contract_with_status(due_days, "active").await
    }

    pub async fn seed_contract_with_status(&self, due_days: Option<i32>, status: &str) -> Contract {
        let contract = Contract {
            contract_id: Uuid::new_v4(),
            payer_id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            billing_cadence: "monthly".to_string(),
            due_days,
            status: status.to_string(),
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        };
        self.store.add_contract(contract.clone()).await;
        contract
    }

    pub async fn seed_service_item(
        &self,
        contract: &Contract,
        kind: &str,
        included: i64,
        minimum: i64,
        unit_price: Decimal,
        overage_price: Option<Decimal>,
    ) -> ContractServiceItem {
        let item = ContractServiceItem {
            item_id: Uuid::new_v4(),
            contract_id: contract.contract_id,
            service_kind: kind.to_string(),
            description: format!("{} service", kind),
            included_quantity: Some(included),
            minimum_quantity: Some(minimum),
            unit_price,
            overage_unit_price: overage_price,
            is_active: true,
            sort_order: 0,
            created_utc: Utc::now(),
        };
        self.store.add_service_item(item.clone()).await;
        item
    }

    /// Record a confirmed receipt on the first day of the last closed month.
    pub async fn seed_receipt(&self, contract: &Contract, units: i64) {
        self.store
            .add_inbound_receipt(InboundReceipt {
                receipt_id: Uuid::new_v4(),
                recipient_id: contract.recipient_id,
                location_id: contract.location_id,
                received_on: last_month().start,
                status: RECEIPT_CONFIRMED.to_string(),
                storage_units: units,
            })
            .await;
    }

    /// Record a dispatched shipment on the last day of the last closed month.
    pub async fn seed_shipment(&self, contract: &Contract, line_items: i64) {
        self.store
            .add_outbound_shipment(OutboundShipment {
                shipment_id: Uuid::new_v4(),
                recipient_id: contract.recipient_id,
                location_id: contract.location_id,
                dispatched_on: last_month().end,
                status: SHIPMENT_EXPEDITED.to_string(),
                line_items,
            })
            .await;
    }

    pub async fn seed_storage_unit(&self, contract: &Contract, remaining: Decimal) {
        self.store
            .add_storage_unit(StorageUnit {
                unit_id: Uuid::new_v4(),
                recipient_id: contract.recipient_id,
                location_id: contract.location_id,
                remaining_quantity: remaining,
            })
            .await;
    }

    /// Seed an active rate table with one bracket per `(min, max, flat value)`.
    pub async fn seed_rate_table(
        &self,
        payer_id: Uuid,
        name: &str,
        transporter_id: Option<Uuid>,
        brackets: &[(Decimal, Decimal, Decimal)],
    ) -> Uuid {
        let record = RateTableRecord {
            table_id: Uuid::new_v4(),
            payer_id,
            transporter_id,
            name: name.to_string(),
            is_active: true,
            created_utc: Utc::now(),
        };
        let table_id = record.table_id;
        let brackets = brackets
            .iter()
            .map(|(min, max, flat)| RateBracket {
                bracket_id: Uuid::new_v4(),
                table_id,
                distance_min: *min,
                distance_max: *max,
                value_up_to_300kg: *flat,
                value_per_kg_above_300: Decimal::new(50, 2),
                toll_per_ton: Decimal::new(20, 0),
                lead_time_days: 2,
            })
            .collect();
        self.store.add_rate_table(record, brackets).await;
        table_id
    }
}

/// Period a monthly contract is billed for right now.
pub fn last_month() -> BillingPeriod {
    compute_period("monthly", Utc::now()).expect("monthly is a valid cadence")
}
