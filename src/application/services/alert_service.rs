use crate::domain::entities::alert::AlertType;
use crate::domain::errors::{AppError, ValidationError};
use crate::domain::value_objects::price::Price;
use crate::persistence::account_repository::AlertRepository;
use crate::persistence::models::{AlertRecord, CreateAlert};
use crate::persistence::DbPool;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NewAlert {
    pub symbol: String,
    pub alert_type: String,
    pub target_price: f64,
    pub message: Option<String>,
}

/// Price alerts. Recorded only; nothing triggers them.
#[derive(Clone)]
pub struct AlertService {
    alerts: AlertRepository,
}

impl AlertService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            alerts: AlertRepository::new(pool),
        }
    }

    pub async fn create(&self, user_id: i64, request: NewAlert) -> Result<AlertRecord, AppError> {
        let symbol = request.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ValidationError::InvalidSymbol("symbol is required".to_string()).into());
        }
        let alert_type = request.alert_type.parse::<AlertType>()?;
        let target_price = Price::new(request.target_price)?;

        Ok(self
            .alerts
            .create(
                user_id,
                CreateAlert {
                    symbol,
                    alert_type,
                    target_price: target_price.value(),
                    message: request.message,
                },
            )
            .await?)
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<AlertRecord>, AppError> {
        Ok(self.alerts.list_for_user(user_id).await?)
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), AppError> {
        if !self.alerts.delete_for_user(user_id, id).await? {
            return Err(AppError::NotFound("Alert not found".to_string()));
        }
        Ok(())
    }
}
