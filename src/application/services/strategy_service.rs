use crate::domain::entities::strategy::StrategyDraft;
use crate::domain::errors::AppError;
use crate::persistence::account_repository::StrategyRepository;
use crate::persistence::models::{CreateStrategy, StrategyRecord};
use crate::persistence::DbPool;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct NewStrategy {
    pub name: String,
    pub description: Option<String>,
    pub strategy_type: String,
    /// Serialized JSON document
    pub parameters: Option<String>,
    pub max_position_size: Option<f64>,
    pub stop_loss_percentage: Option<f64>,
    pub take_profit_percentage: Option<f64>,
}

impl From<NewStrategy> for StrategyDraft {
    fn from(s: NewStrategy) -> Self {
        StrategyDraft {
            name: s.name.trim().to_string(),
            description: s.description,
            strategy_type: s.strategy_type.trim().to_string(),
            parameters: s.parameters,
            max_position_size: s.max_position_size,
            stop_loss_percentage: s.stop_loss_percentage,
            take_profit_percentage: s.take_profit_percentage,
        }
    }
}

/// Strategy definitions. Stored only; nothing evaluates them.
#[derive(Clone)]
pub struct StrategyService {
    strategies: StrategyRepository,
}

impl StrategyService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            strategies: StrategyRepository::new(pool),
        }
    }

    pub async fn create(&self, user_id: i64, request: NewStrategy) -> Result<StrategyRecord, AppError> {
        let draft = StrategyDraft::from(request);
        draft.validate()?;

        let strategy = self
            .strategies
            .create(
                user_id,
                CreateStrategy {
                    name: draft.name,
                    description: draft.description,
                    strategy_type: draft.strategy_type,
                    parameters: draft.parameters,
                    max_position_size: draft.max_position_size,
                    stop_loss_percentage: draft.stop_loss_percentage,
                    take_profit_percentage: draft.take_profit_percentage,
                },
            )
            .await?;

        info!("User {} created strategy {}", user_id, strategy.id);
        Ok(strategy)
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<StrategyRecord>, AppError> {
        Ok(self.strategies.list_for_user(user_id).await?)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<StrategyRecord, AppError> {
        self.strategies
            .get_for_user(user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Strategy not found".to_string()))
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), AppError> {
        if !self.strategies.delete_for_user(user_id, id).await? {
            return Err(AppError::NotFound("Strategy not found".to_string()));
        }
        info!("User {} deleted strategy {}", user_id, id);
        Ok(())
    }
}
