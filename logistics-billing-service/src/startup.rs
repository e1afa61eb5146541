//! Application startup and lifecycle management.

use crate::billing::{InvoiceAssembler, UsageMeter};
use crate::config::BillingConfig;
use crate::freight::FreightTariffResolver;
use crate::handlers::{
    generate_invoice, get_invoice, health_check, metrics_handler, quote_payer, quote_table,
    readiness_check,
};
use crate::services::{
    init_metrics, Database, InvoiceStore, RateTableStore, StoreHealth, UsageSource,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: BillingConfig,
    pub assembler: InvoiceAssembler,
    pub freight: FreightTariffResolver,
    pub invoices: Arc<dyn InvoiceStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl AppState {
    /// Wire the engines over one backing store.
    pub fn new<S>(config: BillingConfig, store: Arc<S>) -> Self
    where
        S: InvoiceStore + UsageSource + RateTableStore + StoreHealth + 'static,
    {
        let invoices: Arc<dyn InvoiceStore> = store.clone();
        let usage: Arc<dyn UsageSource> = store.clone();
        let rates: Arc<dyn RateTableStore> = store.clone();
        let health: Arc<dyn StoreHealth> = store;

        Self {
            assembler: InvoiceAssembler::new(
                invoices.clone(),
                UsageMeter::new(usage),
                config.invoicing.clone(),
            ),
            freight: FreightTariffResolver::new(rates),
            invoices,
            health,
            config,
        }
    }
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application against PostgreSQL, running migrations.
    pub async fn build(config: BillingConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        Self::build_with_store(config, Arc::new(db)).await
    }

    /// Build the application over an already prepared store.
    pub async fn build_with_store<S>(config: BillingConfig, store: Arc<S>) -> Result<Self, AppError>
    where
        S: InvoiceStore + UsageSource + RateTableStore + StoreHealth + 'static,
    {
        init_metrics();

        let state = AppState::new(config.clone(), store);

        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Logistics billing listener bound");

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        tracing::info!(
            service = "logistics-billing-service",
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        axum::serve(self.http_listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}

/// HTTP routes of the service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/invoices/generate", post(generate_invoice))
        .route("/invoices/:invoice_id", get(get_invoice))
        .route("/freight/quote", post(quote_table))
        .route("/freight/quotes", post(quote_payer))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
