//! Database Models
//!
//! Persistent records for every table, plus the input structs used to create them.

use crate::domain::entities::{
    alert::AlertType,
    exchange::Exchange,
    strategy::StrategyStatus,
    trade::{OrderSide, OrderStatus, OrderType},
    user::UserRole,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(skip)]
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub is_verified: bool,
    pub two_factor_enabled: bool,
    #[serde(skip)]
    pub two_factor_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Exchange credential record in database
#[derive(Debug, Clone, FromRow)]
pub struct ApiKeyRecord {
    pub id: i64,
    pub user_id: i64,
    pub exchange_name: Exchange,
    pub api_key: String,
    pub api_secret: String,
    pub is_active: bool,
    pub has_trading_permission: bool,
    pub has_withdrawal_permission: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Trade record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TradeRecord {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub strategy_id: Option<i64>,
    pub exchange_name: Exchange,
    pub symbol: String,
    pub order_type: OrderType,
    pub order_side: OrderSide,
    pub order_status: OrderStatus,
    pub price: Option<f64>,
    pub quantity: f64,
    pub filled_quantity: f64,
    pub average_price: Option<f64>,
    pub fee: f64,
    pub total_cost: Option<f64>,
    pub exchange_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Strategy record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StrategyRecord {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub strategy_type: String,
    pub status: StrategyStatus,
    pub parameters: Option<String>, // JSON string
    pub max_position_size: Option<f64>,
    pub stop_loss_percentage: Option<f64>,
    pub take_profit_percentage: Option<f64>,
    pub total_trades: i64,
    pub winning_trades: i64,
    pub total_profit_loss: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_executed_at: Option<DateTime<Utc>>,
}

/// Portfolio record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PortfolioRecord {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub total_value_usd: f64,
    pub total_profit_loss: f64,
    pub total_profit_loss_percentage: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Portfolio holding record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HoldingRecord {
    pub id: i64,
    #[serde(skip)]
    pub portfolio_id: i64,
    pub symbol: String,
    pub quantity: f64,
    pub average_buy_price: f64,
    pub current_price: Option<f64>,
    pub total_value_usd: Option<f64>,
    pub profit_loss: f64,
    pub profit_loss_percentage: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Alert record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AlertRecord {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub symbol: String,
    pub alert_type: AlertType,
    pub target_price: f64,
    pub is_active: bool,
    pub is_triggered: bool,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,
}

/// Create user input
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub username: String,
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub is_verified: bool,
}

/// Create exchange credential input
#[derive(Debug, Clone)]
pub struct CreateApiKey {
    pub exchange_name: Exchange,
    pub api_key: String,
    pub api_secret: String,
    pub has_trading_permission: bool,
}

/// Create strategy input
#[derive(Debug, Clone)]
pub struct CreateStrategy {
    pub name: String,
    pub description: Option<String>,
    pub strategy_type: String,
    pub parameters: Option<String>,
    pub max_position_size: Option<f64>,
    pub stop_loss_percentage: Option<f64>,
    pub take_profit_percentage: Option<f64>,
}

/// Insert-or-replace holding input, already valued
#[derive(Debug, Clone)]
pub struct UpsertHolding {
    pub symbol: String,
    pub quantity: f64,
    pub average_buy_price: f64,
    pub current_price: f64,
    pub total_value_usd: f64,
    pub profit_loss: f64,
    pub profit_loss_percentage: f64,
}

/// Create alert input
#[derive(Debug, Clone)]
pub struct CreateAlert {
    pub symbol: String,
    pub alert_type: AlertType,
    pub target_price: f64,
    pub message: Option<String>,
}
