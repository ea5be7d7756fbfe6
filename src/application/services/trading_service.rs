use crate::domain::entities::exchange::{mask_api_key, Exchange};
use crate::domain::entities::trade::TradeOrder;
use crate::domain::errors::AppError;
use crate::domain::services::execution_venue::ExecutionVenue;
use crate::persistence::models::{ApiKeyRecord, CreateApiKey, TradeRecord};
use crate::persistence::repository::{ApiKeyRepository, TradeRepository};
use crate::persistence::DbPool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Trades returned when the caller gives no limit
pub const DEFAULT_TRADE_LIMIT: i64 = 50;

/// Trade submission payload. Enum fields stay strings until validated so
/// that unknown values surface as `Bad Request`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitTrade {
    pub symbol: String,
    pub order_type: String,
    pub order_side: String,
    pub quantity: f64,
    pub price: Option<f64>,
}

/// Exchange credential payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewApiKey {
    pub exchange_name: String,
    pub api_key: String,
    pub api_secret: String,
    #[serde(default = "default_trading_permission")]
    pub has_trading_permission: bool,
}

fn default_trading_permission() -> bool {
    true
}

/// Exchange credential as shown to its owner: key masked, secret omitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyView {
    pub id: i64,
    pub exchange_name: Exchange,
    pub api_key: String,
    pub is_active: bool,
    pub has_trading_permission: bool,
    pub has_withdrawal_permission: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKeyRecord> for ApiKeyView {
    fn from(record: ApiKeyRecord) -> Self {
        Self {
            id: record.id,
            exchange_name: record.exchange_name,
            api_key: mask_api_key(&record.api_key),
            is_active: record.is_active,
            has_trading_permission: record.has_trading_permission,
            has_withdrawal_permission: record.has_withdrawal_permission,
            created_at: record.created_at,
        }
    }
}

/// Trade recording service
#[derive(Clone)]
pub struct TradingService {
    api_keys: ApiKeyRepository,
    trades: TradeRepository,
    venue: Arc<dyn ExecutionVenue>,
}

impl TradingService {
    pub fn new(pool: DbPool, venue: Arc<dyn ExecutionVenue>) -> Self {
        Self {
            api_keys: ApiKeyRepository::new(pool.clone()),
            trades: TradeRepository::new(pool),
            venue,
        }
    }

    /// Validate, record and execute a trade for `user_id`.
    ///
    /// Requires an active exchange credential; its exchange is stamped on the trade.
    pub async fn submit_trade(&self, user_id: i64, request: SubmitTrade) -> Result<TradeRecord, AppError> {
        let order = TradeOrder::new(
            &request.symbol,
            &request.order_type,
            &request.order_side,
            request.quantity,
            request.price,
        )?;

        let Some(credential) = self.api_keys.find_active(user_id).await? else {
            warn!("User {} submitted a trade without an active API key", user_id);
            return Err(AppError::PreconditionFailed(
                "No active exchange API key configured. Please add API keys in settings.".to_string(),
            ));
        };

        let trade = self
            .trades
            .create_and_execute(user_id, credential.exchange_name, &order, self.venue.as_ref())
            .await?;

        info!(
            "Trade {} recorded for user {}: {} {} {} on {}",
            trade.id,
            user_id,
            trade.order_side.as_str(),
            trade.quantity,
            trade.symbol,
            trade.exchange_name
        );
        Ok(trade)
    }

    /// Newest-first trade history
    pub async fn list_trades(&self, user_id: i64, limit: Option<i64>) -> Result<Vec<TradeRecord>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_TRADE_LIMIT);
        if limit <= 0 {
            return Err(AppError::BadRequest("limit must be a positive integer".to_string()));
        }
        Ok(self.trades.list_for_user(user_id, limit).await?)
    }

    pub async fn get_trade(&self, user_id: i64, trade_id: i64) -> Result<TradeRecord, AppError> {
        self.trades
            .get_for_user(user_id, trade_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trade not found".to_string()))
    }

    pub async fn add_api_key(&self, user_id: i64, request: NewApiKey) -> Result<ApiKeyView, AppError> {
        let exchange_name = request.exchange_name.parse::<Exchange>()?;
        if request.api_key.trim().is_empty() || request.api_secret.trim().is_empty() {
            return Err(AppError::BadRequest("api_key and api_secret are required".to_string()));
        }

        let record = self
            .api_keys
            .create(
                user_id,
                CreateApiKey {
                    exchange_name,
                    api_key: request.api_key,
                    api_secret: request.api_secret,
                    has_trading_permission: request.has_trading_permission,
                },
            )
            .await?;

        Ok(record.into())
    }

    pub async fn list_api_keys(&self, user_id: i64) -> Result<Vec<ApiKeyView>, AppError> {
        let keys = self.api_keys.list_for_user(user_id).await?;
        Ok(keys.into_iter().map(ApiKeyView::from).collect())
    }

    pub async fn delete_api_key(&self, user_id: i64, key_id: i64) -> Result<(), AppError> {
        if !self.api_keys.delete(user_id, key_id).await? {
            return Err(AppError::NotFound("API key not found".to_string()));
        }
        Ok(())
    }
}
