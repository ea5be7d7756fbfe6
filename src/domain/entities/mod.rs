pub mod alert;
pub mod exchange;
pub mod portfolio;
pub mod strategy;
pub mod trade;
pub mod user;
