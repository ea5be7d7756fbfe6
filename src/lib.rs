//! Tradeboard Library
//!
//! Backend for a cryptocurrency trading dashboard: accounts and bearer-token
//! authentication, exchange credentials, a simulated trade ledger, portfolio
//! holdings, strategies, price alerts and a Binance market-data gateway.

pub mod api;
pub mod application;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
