//! Account-scoped repositories: portfolio holdings, strategies and alerts.

use super::models::*;
use super::{DatabaseError, DbPool};
use crate::domain::entities::portfolio::PortfolioTotals;
use crate::domain::entities::strategy::StrategyStatus;
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use tracing::debug;

/// Portfolio and holdings repository
#[derive(Clone)]
pub struct PortfolioRepository {
    pool: DbPool,
}

impl PortfolioRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get_for_user(&self, user_id: i64) -> Result<Option<PortfolioRecord>, DatabaseError> {
        sqlx::query_as::<_, PortfolioRecord>("SELECT * FROM portfolios WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("get portfolio", e))
    }

    pub async fn list_holdings(&self, portfolio_id: i64) -> Result<Vec<HoldingRecord>, DatabaseError> {
        sqlx::query_as::<_, HoldingRecord>(
            "SELECT * FROM portfolio_holdings WHERE portfolio_id = ?1 ORDER BY symbol ASC",
        )
        .bind(portfolio_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("list holdings", e))
    }

    /// Insert or replace the holding for `symbol`, then refresh portfolio totals
    pub async fn upsert_holding(
        &self,
        portfolio_id: i64,
        holding: UpsertHolding,
    ) -> Result<HoldingRecord, DatabaseError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, HoldingRecord>(
            r#"
            INSERT INTO portfolio_holdings (
                portfolio_id, symbol, quantity, average_buy_price, current_price,
                total_value_usd, profit_loss, profit_loss_percentage, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(portfolio_id, symbol) DO UPDATE SET
                quantity = excluded.quantity,
                average_buy_price = excluded.average_buy_price,
                current_price = excluded.current_price,
                total_value_usd = excluded.total_value_usd,
                profit_loss = excluded.profit_loss,
                profit_loss_percentage = excluded.profit_loss_percentage,
                updated_at = excluded.created_at
            RETURNING *
            "#,
        )
        .bind(portfolio_id)
        .bind(&holding.symbol)
        .bind(holding.quantity)
        .bind(holding.average_buy_price)
        .bind(holding.current_price)
        .bind(holding.total_value_usd)
        .bind(holding.profit_loss)
        .bind(holding.profit_loss_percentage)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DatabaseError::query("upsert holding", e))?;

        refresh_totals(&mut tx, portfolio_id).await?;
        tx.commit().await?;

        debug!("Holding {} set in portfolio {}", record.symbol, portfolio_id);
        Ok(record)
    }

    pub async fn remove_holding(&self, portfolio_id: i64, symbol: &str) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let rows_affected = sqlx::query(
            "DELETE FROM portfolio_holdings WHERE portfolio_id = ?1 AND symbol = ?2",
        )
        .bind(portfolio_id)
        .bind(symbol)
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::query("delete holding", e))?
        .rows_affected();

        if rows_affected > 0 {
            refresh_totals(&mut tx, portfolio_id).await?;
        }
        tx.commit().await?;

        Ok(rows_affected > 0)
    }
}

/// Recompute the portfolio rollup from its holdings inside `tx`
async fn refresh_totals(
    tx: &mut Transaction<'_, Sqlite>,
    portfolio_id: i64,
) -> Result<PortfolioTotals, DatabaseError> {
    let rows: Vec<(Option<f64>, f64)> = sqlx::query_as(
        "SELECT total_value_usd, profit_loss FROM portfolio_holdings WHERE portfolio_id = ?1",
    )
    .bind(portfolio_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| DatabaseError::query("load holdings", e))?;

    let totals =
        PortfolioTotals::from_holdings(rows.into_iter().map(|(value, pnl)| (value.unwrap_or(0.0), pnl)));

    sqlx::query(
        r#"
        UPDATE portfolios
        SET total_value_usd = ?1, total_profit_loss = ?2,
            total_profit_loss_percentage = ?3, updated_at = ?4
        WHERE id = ?5
        "#,
    )
    .bind(totals.total_value_usd)
    .bind(totals.total_profit_loss)
    .bind(totals.total_profit_loss_percentage)
    .bind(Utc::now())
    .bind(portfolio_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| DatabaseError::query("update portfolio totals", e))?;

    Ok(totals)
}

/// Strategy repository
#[derive(Clone)]
pub struct StrategyRepository {
    pool: DbPool,
}

impl StrategyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: i64, strategy: CreateStrategy) -> Result<StrategyRecord, DatabaseError> {
        let record = sqlx::query_as::<_, StrategyRecord>(
            r#"
            INSERT INTO strategies (
                user_id, name, description, strategy_type, status, parameters,
                max_position_size, stop_loss_percentage, take_profit_percentage,
                total_trades, winning_trades, total_profit_loss, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 0, 0.0, ?10)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&strategy.name)
        .bind(&strategy.description)
        .bind(&strategy.strategy_type)
        .bind(StrategyStatus::default())
        .bind(&strategy.parameters)
        .bind(strategy.max_position_size)
        .bind(strategy.stop_loss_percentage)
        .bind(strategy.take_profit_percentage)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("create strategy", e))?;

        debug!("Created strategy {} '{}' for user {}", record.id, record.name, user_id);
        Ok(record)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<StrategyRecord>, DatabaseError> {
        sqlx::query_as::<_, StrategyRecord>(
            "SELECT * FROM strategies WHERE user_id = ?1 ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("list strategies", e))
    }

    pub async fn get_for_user(&self, user_id: i64, id: i64) -> Result<Option<StrategyRecord>, DatabaseError> {
        sqlx::query_as::<_, StrategyRecord>("SELECT * FROM strategies WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("get strategy", e))
    }

    /// Delete a strategy, detaching any trades that reference it
    pub async fn delete_for_user(&self, user_id: i64, id: i64) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE trades SET strategy_id = NULL
            WHERE strategy_id = ?1
              AND strategy_id IN (SELECT id FROM strategies WHERE id = ?1 AND user_id = ?2)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::query("detach strategy trades", e))?;

        let rows_affected = sqlx::query("DELETE FROM strategies WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::query("delete strategy", e))?
            .rows_affected();

        tx.commit().await?;

        Ok(rows_affected > 0)
    }
}

/// Price alert repository
#[derive(Clone)]
pub struct AlertRepository {
    pool: DbPool,
}

impl AlertRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: i64, alert: CreateAlert) -> Result<AlertRecord, DatabaseError> {
        sqlx::query_as::<_, AlertRecord>(
            r#"
            INSERT INTO alerts (
                user_id, symbol, alert_type, target_price, is_active,
                is_triggered, message, created_at
            )
            VALUES (?1, ?2, ?3, ?4, 1, 0, ?5, ?6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&alert.symbol)
        .bind(alert.alert_type)
        .bind(alert.target_price)
        .bind(&alert.message)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("create alert", e))
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<AlertRecord>, DatabaseError> {
        sqlx::query_as::<_, AlertRecord>("SELECT * FROM alerts WHERE user_id = ?1 ORDER BY id DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("list alerts", e))
    }

    pub async fn delete_for_user(&self, user_id: i64, id: i64) -> Result<bool, DatabaseError> {
        let rows_affected = sqlx::query("DELETE FROM alerts WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("delete alert", e))?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::alert::AlertType;
    use crate::domain::entities::user::UserRole;
    use crate::persistence::repository::UserRepository;
    use crate::persistence::test_pool;

    async fn user(pool: &DbPool, name: &str) -> i64 {
        UserRepository::new(pool.clone())
            .create_with_portfolio(CreateUser {
                email: format!("{}@example.com", name),
                username: name.to_string(),
                hashed_password: "hash".to_string(),
                full_name: None,
                role: UserRole::User,
                is_verified: false,
            })
            .await
            .unwrap()
            .id
    }

    fn holding(symbol: &str, quantity: f64, avg: f64, current: f64) -> UpsertHolding {
        UpsertHolding {
            symbol: symbol.to_string(),
            quantity,
            average_buy_price: avg,
            current_price: current,
            total_value_usd: quantity * current,
            profit_loss: (current - avg) * quantity,
            profit_loss_percentage: (current - avg) / avg * 100.0,
        }
    }

    #[tokio::test]
    async fn test_new_portfolio_is_empty() {
        let pool = test_pool().await;
        let user_id = user(&pool, "ann").await;
        let repo = PortfolioRepository::new(pool);

        let portfolio = repo.get_for_user(user_id).await.unwrap().unwrap();
        assert_eq!(portfolio.total_value_usd, 0.0);
        assert_eq!(portfolio.total_profit_loss, 0.0);
        assert_eq!(portfolio.total_profit_loss_percentage, 0.0);
        assert!(repo.list_holdings(portfolio.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_refreshes_totals() {
        let pool = test_pool().await;
        let user_id = user(&pool, "ben").await;
        let repo = PortfolioRepository::new(pool);
        let portfolio = repo.get_for_user(user_id).await.unwrap().unwrap();

        repo.upsert_holding(portfolio.id, holding("BTC", 1.0, 100.0, 150.0)).await.unwrap();
        repo.upsert_holding(portfolio.id, holding("ETH", 2.0, 50.0, 50.0)).await.unwrap();
        let replaced = repo
            .upsert_holding(portfolio.id, holding("BTC", 2.0, 100.0, 150.0))
            .await
            .unwrap();
        assert_eq!(replaced.quantity, 2.0);
        assert!(replaced.updated_at.is_some());

        let holdings = repo.list_holdings(portfolio.id).await.unwrap();
        assert_eq!(holdings.len(), 2);

        let refreshed = repo.get_for_user(user_id).await.unwrap().unwrap();
        assert_eq!(refreshed.total_value_usd, 400.0);
        assert_eq!(refreshed.total_profit_loss, 100.0);
        assert_eq!(refreshed.total_profit_loss_percentage, 100.0 / 300.0 * 100.0);

        assert!(repo.remove_holding(portfolio.id, "BTC").await.unwrap());
        assert!(!repo.remove_holding(portfolio.id, "BTC").await.unwrap());
        let after = repo.get_for_user(user_id).await.unwrap().unwrap();
        assert_eq!(after.total_value_usd, 100.0);
        assert_eq!(after.total_profit_loss, 0.0);
    }

    #[tokio::test]
    async fn test_strategy_delete_detaches_trades() {
        let pool = test_pool().await;
        let user_id = user(&pool, "cat").await;
        let repo = StrategyRepository::new(pool.clone());

        let strategy = repo
            .create(
                user_id,
                CreateStrategy {
                    name: "grid".to_string(),
                    description: None,
                    strategy_type: "grid".to_string(),
                    parameters: Some("{}".to_string()),
                    max_position_size: None,
                    stop_loss_percentage: None,
                    take_profit_percentage: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(strategy.status, StrategyStatus::Paused);
        assert_eq!(strategy.total_trades, 0);

        sqlx::query(
            "INSERT INTO trades (user_id, strategy_id, exchange_name, symbol, order_type, order_side, quantity) \
             VALUES (?1, ?2, 'binance', 'BTC/USDT', 'market', 'buy', 1.0)",
        )
        .bind(user_id)
        .bind(strategy.id)
        .execute(&pool)
        .await
        .unwrap();

        let other = user(&pool, "dog").await;
        assert!(!repo.delete_for_user(other, strategy.id).await.unwrap());
        assert!(repo.get_for_user(user_id, strategy.id).await.unwrap().is_some());

        assert!(repo.delete_for_user(user_id, strategy.id).await.unwrap());
        let (linked,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trades WHERE strategy_id IS NOT NULL")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(linked, 0);
        assert!(repo.list_for_user(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alerts_are_scoped_to_owner() {
        let pool = test_pool().await;
        let owner = user(&pool, "eve").await;
        let stranger = user(&pool, "fay").await;
        let repo = AlertRepository::new(pool);

        let alert = repo
            .create(
                owner,
                CreateAlert {
                    symbol: "BTC".to_string(),
                    alert_type: AlertType::PriceAbove,
                    target_price: 50_000.0,
                    message: Some("moon".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(alert.is_active);
        assert!(!alert.is_triggered);

        assert!(repo.list_for_user(stranger).await.unwrap().is_empty());
        assert!(!repo.delete_for_user(stranger, alert.id).await.unwrap());
        assert!(repo.delete_for_user(owner, alert.id).await.unwrap());
        assert!(repo.list_for_user(owner).await.unwrap().is_empty());
    }
}
