//! Persistence Layer
//!
//! SQLite storage for users, exchange credentials, trades, strategies,
//! portfolios and alerts, accessed asynchronously through sqlx.
//!
//! # Database Schema
//!
//! Every child table carries a plain foreign key to its owner. Nothing cascades
//! implicitly: owner deletion goes through [`repository::UserRepository::delete_cascade`],
//! which removes children before the parent inside one transaction.
//!
//! - `users`: credentials, role, verification flags
//! - `exchange_api_keys`: opaque exchange credentials per user
//! - `strategies`: strategy definitions and (unmaintained) performance counters
//! - `trades`: trade ledger, optionally linked to a strategy
//! - `portfolios`: exactly one per user
//! - `portfolio_holdings`: per-symbol positions inside a portfolio
//! - `alerts`: price alerts

pub mod account_repository;
pub mod models;
pub mod repository;

use crate::config::AppConfig;
use crate::domain::errors::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info};

/// Database connection pool
pub type DbPool = SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
}

impl DatabaseError {
    /// Classify a failed query, logging it with the attempted operation
    pub(crate) fn query(operation: &str, e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return DatabaseError::UniqueViolation(db_err.message().to_string());
            }
        }
        error!("Failed to {}: {}", operation, e);
        DatabaseError::QueryError(format!("Failed to {}: {}", operation, e))
    }
}

impl From<DatabaseError> for AppError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::UniqueViolation(msg) => AppError::Conflict(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://data/crypto_trading.db")
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Enable query logging
    pub log_queries: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/crypto_trading.db".to_string(),
            max_connections: 5,
            log_queries: cfg!(debug_assertions),
        }
    }
}

impl DatabaseConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            url: config.database_url.clone(),
            max_connections: config.database_max_connections,
            log_queries: config.debug,
        }
    }

    /// Configuration for a private in-memory database (tests, seeding dry runs)
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            log_queries: false,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Initialize the database connection pool and apply the schema
pub async fn init_database(config: &DatabaseConfig) -> Result<DbPool, DatabaseError> {
    info!("Initializing database: {}", config.url);

    // Ensure data directory exists
    if let Some(db_path) = config.url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::ConnectionError(sqlx::Error::Configuration(Box::new(e)))
                })?;
            }
        }
    }

    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let options = if config.log_queries {
        options.log_statements(tracing::log::LevelFilter::Debug)
    } else {
        options.disable_statement_logging()
    };

    // Each connection to `sqlite::memory:` is its own database, so pin the pool
    // to a single connection that is never recycled
    let pool = if config.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?
    };

    run_migrations(&pool).await?;

    info!("✓ Database initialized successfully");

    Ok(pool)
}

const SCHEMA: &[(&str, &str)] = &[
    (
        "users table",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL UNIQUE,
            hashed_password TEXT NOT NULL,
            full_name TEXT,
            role TEXT NOT NULL DEFAULT 'user' CHECK(role IN ('user', 'admin')),
            is_active BOOLEAN NOT NULL DEFAULT 1,
            is_verified BOOLEAN NOT NULL DEFAULT 0,
            two_factor_enabled BOOLEAN NOT NULL DEFAULT 0,
            two_factor_secret TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME
        )
        "#,
    ),
    (
        "exchange_api_keys table",
        r#"
        CREATE TABLE IF NOT EXISTS exchange_api_keys (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            exchange_name TEXT NOT NULL
                CHECK(exchange_name IN ('binance', 'coinbase', 'kraken', 'kucoin')),
            api_key TEXT NOT NULL,
            api_secret TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT 1,
            has_trading_permission BOOLEAN NOT NULL DEFAULT 1,
            has_withdrawal_permission BOOLEAN NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    ),
    (
        "strategies table",
        r#"
        CREATE TABLE IF NOT EXISTS strategies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            strategy_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'paused'
                CHECK(status IN ('active', 'paused', 'stopped')),
            parameters TEXT,
            max_position_size REAL,
            stop_loss_percentage REAL,
            take_profit_percentage REAL,
            total_trades INTEGER NOT NULL DEFAULT 0,
            winning_trades INTEGER NOT NULL DEFAULT 0,
            total_profit_loss REAL NOT NULL DEFAULT 0.0,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME,
            last_executed_at DATETIME,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    ),
    (
        "trades table",
        r#"
        CREATE TABLE IF NOT EXISTS trades (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            strategy_id INTEGER,
            exchange_name TEXT NOT NULL,
            symbol TEXT NOT NULL,
            order_type TEXT NOT NULL
                CHECK(order_type IN ('market', 'limit', 'stop_loss', 'take_profit')),
            order_side TEXT NOT NULL CHECK(order_side IN ('buy', 'sell')),
            order_status TEXT NOT NULL DEFAULT 'pending'
                CHECK(order_status IN ('pending', 'filled', 'partially_filled', 'cancelled', 'failed')),
            price REAL,
            quantity REAL NOT NULL,
            filled_quantity REAL NOT NULL DEFAULT 0.0,
            average_price REAL,
            fee REAL NOT NULL DEFAULT 0.0,
            total_cost REAL,
            exchange_order_id TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            executed_at DATETIME,
            updated_at DATETIME,
            FOREIGN KEY (user_id) REFERENCES users(id),
            FOREIGN KEY (strategy_id) REFERENCES strategies(id)
        )
        "#,
    ),
    (
        "portfolios table",
        r#"
        CREATE TABLE IF NOT EXISTS portfolios (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL UNIQUE,
            total_value_usd REAL NOT NULL DEFAULT 0.0,
            total_profit_loss REAL NOT NULL DEFAULT 0.0,
            total_profit_loss_percentage REAL NOT NULL DEFAULT 0.0,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    ),
    (
        "portfolio_holdings table",
        r#"
        CREATE TABLE IF NOT EXISTS portfolio_holdings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            portfolio_id INTEGER NOT NULL,
            symbol TEXT NOT NULL,
            quantity REAL NOT NULL,
            average_buy_price REAL NOT NULL,
            current_price REAL,
            total_value_usd REAL,
            profit_loss REAL NOT NULL DEFAULT 0.0,
            profit_loss_percentage REAL NOT NULL DEFAULT 0.0,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME,
            UNIQUE (portfolio_id, symbol),
            FOREIGN KEY (portfolio_id) REFERENCES portfolios(id)
        )
        "#,
    ),
    (
        "alerts table",
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            symbol TEXT NOT NULL,
            alert_type TEXT NOT NULL CHECK(alert_type IN ('price_above', 'price_below')),
            target_price REAL NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT 1,
            is_triggered BOOLEAN NOT NULL DEFAULT 0,
            message TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            triggered_at DATETIME,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    ),
    (
        "index",
        "CREATE INDEX IF NOT EXISTS idx_trades_user_id ON trades(user_id)",
    ),
    (
        "index",
        "CREATE INDEX IF NOT EXISTS idx_trades_strategy_id ON trades(strategy_id)",
    ),
    (
        "index",
        "CREATE INDEX IF NOT EXISTS idx_api_keys_user_id ON exchange_api_keys(user_id)",
    ),
    (
        "index",
        "CREATE INDEX IF NOT EXISTS idx_strategies_user_id ON strategies(user_id)",
    ),
    (
        "index",
        "CREATE INDEX IF NOT EXISTS idx_alerts_user_id ON alerts(user_id)",
    ),
];

/// Run database migrations
async fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    info!("Running database migrations...");

    for (name, statement) in SCHEMA {
        sqlx::query(statement).execute(pool).await.map_err(|e| {
            DatabaseError::MigrationError(format!("Failed to create {}: {}", name, e))
        })?;
    }

    info!("✓ Database migrations completed successfully");

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> DbPool {
    init_database(&DatabaseConfig::in_memory())
        .await
        .expect("in-memory database should initialize")
}
