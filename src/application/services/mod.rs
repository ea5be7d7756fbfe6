pub mod alert_service;
pub mod auth_service;
pub mod market_service;
pub mod portfolio_service;
pub mod strategy_service;
pub mod trading_service;
