use crate::domain::errors::ValidationError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum StrategyStatus {
    Active,
    #[default]
    Paused,
    Stopped,
}

/// Strategy definition as submitted by a user.
///
/// `parameters` is an opaque JSON document; it is checked for syntax only.
#[derive(Debug, Clone)]
pub struct StrategyDraft {
    pub name: String,
    pub description: Option<String>,
    pub strategy_type: String,
    pub parameters: Option<String>,
    pub max_position_size: Option<f64>,
    pub stop_loss_percentage: Option<f64>,
    pub take_profit_percentage: Option<f64>,
}

impl StrategyDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() || self.strategy_type.trim().is_empty() {
            return Err(ValidationError::InvalidField(
                "strategy name and type are required".to_string(),
            ));
        }
        if let Some(params) = &self.parameters {
            serde_json::from_str::<serde_json::Value>(params).map_err(|e| {
                ValidationError::InvalidField(format!("parameters must be valid JSON: {}", e))
            })?;
        }
        for value in [
            self.max_position_size,
            self.stop_loss_percentage,
            self.take_profit_percentage,
        ]
        .into_iter()
        .flatten()
        {
            if !value.is_finite() || value <= 0.0 {
                return Err(ValidationError::MustBePositive);
            }
        }
        Ok(())
    }
}
