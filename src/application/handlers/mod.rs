pub mod alert_handler;
pub mod auth_handler;
pub mod extract;
pub mod market_handler;
pub mod portfolio_handler;
pub mod strategy_handler;
pub mod trading_handler;
