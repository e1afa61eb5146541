//! logistics-billing-service: contract usage billing and freight tariff resolution.

pub mod billing;
pub mod config;
pub mod dtos;
pub mod error;
pub mod freight;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
