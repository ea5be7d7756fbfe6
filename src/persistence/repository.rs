//! Database Repository
//!
//! Data access for users, exchange credentials and the trade ledger.

use super::models::*;
use super::{DatabaseError, DbPool};
use crate::domain::entities::exchange::Exchange;
use crate::domain::entities::trade::{OrderStatus, TradeOrder};
use crate::domain::services::execution_venue::ExecutionVenue;
use chrono::Utc;
use tracing::{debug, warn};

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a user together with its empty portfolio, atomically
    pub async fn create_with_portfolio(&self, user: CreateUser) -> Result<UserRecord, DatabaseError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (
                email, username, hashed_password, full_name, role,
                is_active, is_verified, two_factor_enabled, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, 0, ?7)
            RETURNING *
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.hashed_password)
        .bind(&user.full_name)
        .bind(user.role)
        .bind(user.is_verified)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DatabaseError::query("create user", e))?;

        sqlx::query(
            r#"
            INSERT INTO portfolios (
                user_id, total_value_usd, total_profit_loss,
                total_profit_loss_percentage, created_at
            )
            VALUES (?1, 0.0, 0.0, 0.0, ?2)
            "#,
        )
        .bind(record.id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::query("create portfolio", e))?;

        tx.commit().await?;

        debug!("Created user {} ({})", record.id, record.email);
        Ok(record)
    }

    pub async fn get(&self, id: i64) -> Result<Option<UserRecord>, DatabaseError> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("get user", e))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("get user by email", e))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("get user by username", e))
    }

    /// Toggle the active flag; inactive users can no longer resolve tokens
    #[cfg(test)]
    pub async fn set_active(&self, id: i64, active: bool) -> Result<bool, DatabaseError> {
        let rows_affected = sqlx::query("UPDATE users SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("update user", e))?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Delete a user and everything it owns.
    ///
    /// Children are removed before their parents inside one transaction:
    /// holdings, portfolio, alerts, trades, strategies, API keys, then the user.
    pub async fn delete_cascade(&self, id: i64) -> Result<bool, DatabaseError> {
        const STEPS: &[(&str, &str)] = &[
            (
                "delete holdings",
                "DELETE FROM portfolio_holdings WHERE portfolio_id IN \
                 (SELECT id FROM portfolios WHERE user_id = ?1)",
            ),
            ("delete portfolio", "DELETE FROM portfolios WHERE user_id = ?1"),
            ("delete alerts", "DELETE FROM alerts WHERE user_id = ?1"),
            ("delete trades", "DELETE FROM trades WHERE user_id = ?1"),
            ("delete strategies", "DELETE FROM strategies WHERE user_id = ?1"),
            ("delete api keys", "DELETE FROM exchange_api_keys WHERE user_id = ?1"),
        ];

        let mut tx = self.pool.begin().await?;

        for (operation, statement) in STEPS {
            sqlx::query(statement)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::query(operation, e))?;
        }

        let rows_affected = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::query("delete user", e))?
            .rows_affected();

        tx.commit().await?;

        debug!("Deleted user {} and owned records", id);
        Ok(rows_affected > 0)
    }
}

/// Exchange credential repository
#[derive(Clone)]
pub struct ApiKeyRepository {
    pool: DbPool,
}

impl ApiKeyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: i64, key: CreateApiKey) -> Result<ApiKeyRecord, DatabaseError> {
        let record = sqlx::query_as::<_, ApiKeyRecord>(
            r#"
            INSERT INTO exchange_api_keys (
                user_id, exchange_name, api_key, api_secret, is_active,
                has_trading_permission, has_withdrawal_permission, created_at
            )
            VALUES (?1, ?2, ?3, ?4, 1, ?5, 0, ?6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(key.exchange_name)
        .bind(&key.api_key)
        .bind(&key.api_secret)
        .bind(key.has_trading_permission)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("create api key", e))?;

        debug!("Stored {} API key {} for user {}", record.exchange_name, record.id, user_id);
        Ok(record)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<ApiKeyRecord>, DatabaseError> {
        sqlx::query_as::<_, ApiKeyRecord>(
            "SELECT * FROM exchange_api_keys WHERE user_id = ?1 ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("list api keys", e))
    }

    /// Oldest active credential of the user, if any
    pub async fn find_active(&self, user_id: i64) -> Result<Option<ApiKeyRecord>, DatabaseError> {
        sqlx::query_as::<_, ApiKeyRecord>(
            "SELECT * FROM exchange_api_keys WHERE user_id = ?1 AND is_active = 1 ORDER BY id ASC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("find active api key", e))
    }

    #[cfg(test)]
    pub async fn set_active(&self, user_id: i64, id: i64, active: bool) -> Result<bool, DatabaseError> {
        let rows_affected = sqlx::query(
            "UPDATE exchange_api_keys SET is_active = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
        )
        .bind(active)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("update api key", e))?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<bool, DatabaseError> {
        let rows_affected = sqlx::query("DELETE FROM exchange_api_keys WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("delete api key", e))?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}

/// Trade repository
#[derive(Clone)]
pub struct TradeRepository {
    pool: DbPool,
}

impl TradeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Record a trade as `pending`, hand it to the venue and store the outcome.
    ///
    /// Both writes share one transaction, so readers only ever observe the
    /// final state.
    pub async fn create_and_execute(
        &self,
        user_id: i64,
        exchange: Exchange,
        order: &TradeOrder,
        venue: &dyn ExecutionVenue,
    ) -> Result<TradeRecord, DatabaseError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let pending = sqlx::query_as::<_, TradeRecord>(
            r#"
            INSERT INTO trades (
                user_id, exchange_name, symbol, order_type, order_side,
                order_status, price, quantity, filled_quantity, fee, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, 0.0, 0.0, ?8)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(exchange)
        .bind(&order.symbol)
        .bind(order.order_type)
        .bind(order.order_side)
        .bind(order.price.map(|p| p.value()))
        .bind(order.quantity.value())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DatabaseError::query("create trade", e))?;

        let report = venue.execute(order);
        if !pending.order_status.can_transition_to(report.status) {
            warn!(
                "Venue reported illegal transition {} -> {} for trade {}",
                pending.order_status, report.status, pending.id
            );
            return Err(DatabaseError::QueryError(format!(
                "Illegal status transition {} -> {}",
                pending.order_status, report.status
            )));
        }

        let executed_at = match report.status {
            OrderStatus::Filled | OrderStatus::PartiallyFilled => Some(Utc::now()),
            _ => None,
        };

        let record = sqlx::query_as::<_, TradeRecord>(
            r#"
            UPDATE trades
            SET order_status = ?1, filled_quantity = ?2, average_price = ?3,
                total_cost = ?4, fee = ?5, exchange_order_id = ?6,
                executed_at = ?7, updated_at = ?8
            WHERE id = ?9 AND order_status = 'pending'
            RETURNING *
            "#,
        )
        .bind(report.status)
        .bind(report.filled_quantity)
        .bind(report.average_price)
        .bind(report.total_cost)
        .bind(report.fee)
        .bind(&report.exchange_order_id)
        .bind(executed_at)
        .bind(Utc::now())
        .bind(pending.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DatabaseError::query("apply trade execution", e))?;

        tx.commit().await?;

        debug!(
            "Trade {} {} {} {} -> {}",
            record.id,
            record.order_side.as_str(),
            record.quantity,
            record.symbol,
            record.order_status
        );
        Ok(record)
    }

    /// Trades of one user, newest first
    pub async fn list_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<TradeRecord>, DatabaseError> {
        // Row ids are assigned in insertion order, so they break timestamp ties
        sqlx::query_as::<_, TradeRecord>(
            "SELECT * FROM trades WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("list trades", e))
    }

    pub async fn get_for_user(&self, user_id: i64, id: i64) -> Result<Option<TradeRecord>, DatabaseError> {
        sqlx::query_as::<_, TradeRecord>("SELECT * FROM trades WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("get trade", e))
    }

    #[cfg(test)]
    pub async fn count_for_user(&self, user_id: i64) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trades WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("count trades", e))?;

        Ok(count)
    }
}
