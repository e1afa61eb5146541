//! Configuration module for logistics-billing-service.

use service_core::config::{self as core_config, get_env, is_production};
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub invoicing: InvoicingConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Invoice numbering and due date settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicingConfig {
    pub number_prefix: String,
    /// Due-day offset for contracts that do not set their own.
    pub default_due_days: i64,
    /// Attempts at allocating a free invoice number before giving up.
    pub max_number_attempts: u32,
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            number_prefix: "FAT".to_string(),
            default_due_days: 10,
            max_number_attempts: 3,
        }
    }
}

impl BillingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = is_production();

        let invoicing = InvoicingConfig {
            number_prefix: env::var("INVOICE_NUMBER_PREFIX").unwrap_or_else(|_| "FAT".to_string()),
            default_due_days: parse_env("INVOICE_DEFAULT_DUE_DAYS", 10)?,
            max_number_attempts: parse_env("INVOICE_NUMBER_MAX_ATTEMPTS", 3)?,
        };
        if invoicing.number_prefix.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "INVOICE_NUMBER_PREFIX must not be empty"
            )));
        }
        if invoicing.max_number_attempts == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "INVOICE_NUMBER_MAX_ATTEMPTS must be at least 1"
            )));
        }

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "logistics-billing-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", 1)?,
            },
            invoicing,
        })
    }
}

/// Parse an optional numeric variable; a present but malformed value is an error.
fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, raw))
        }),
        Err(_) => Ok(default),
    }
}
