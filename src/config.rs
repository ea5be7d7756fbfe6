use crate::infrastructure::binance_client::BINANCE_API_BASE;
use zeroize::Zeroizing;

/// Placeholder signing secret used when `SECRET_KEY` is not provided
const DEFAULT_SECRET_KEY: &str = "your-secret-key-change-this-in-production-min-32-characters";

/// Minimum recommended signing secret length (256 bits)
const MIN_SECRET_LENGTH: usize = 32;

/// Application configuration, built once at startup and shared with every component
#[derive(Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub debug: bool,

    // Storage
    pub database_url: String,
    pub database_max_connections: u32,

    // Token signing
    pub secret_key: Zeroizing<String>,
    pub algorithm: String,
    pub access_token_expire_minutes: i64,
    pub bcrypt_cost: u32,

    // HTTP surface
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,     // Comma-separated list
    pub request_timeout_seconds: u64,

    // Market data upstream
    pub market_data_base_url: String,
    pub market_data_timeout_seconds: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_name", &self.app_name)
            .field("debug", &self.debug)
            .field("database_url", &self.database_url)
            .field("database_max_connections", &self.database_max_connections)
            .field("secret_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("market_data_base_url", &self.market_data_base_url)
            .field("market_data_timeout_seconds", &self.market_data_timeout_seconds)
            .finish()
    }
}

/// `true` (any case) or `1`; anything else is off
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Default tracing filter, verbose only when `DEBUG` is switched on.
///
/// Read before [`AppConfig::from_env`] so its warnings reach the subscriber.
pub fn default_log_filter() -> &'static str {
    match std::env::var("DEBUG") {
        Ok(value) if parse_flag(&value) => "tradeboard=debug,tower_http=debug",
        _ => "tradeboard=info,tower_http=info",
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Crypto Trading Bot".to_string(),
            debug: true,
            database_url: "sqlite://data/crypto_trading.db".to_string(),
            database_max_connections: 5,
            secret_key: Zeroizing::new(DEFAULT_SECRET_KEY.to_string()),
            algorithm: "HS256".to_string(),
            access_token_expire_minutes: 30,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: "http://localhost:5173,http://localhost:3000".to_string(),
            request_timeout_seconds: 30,
            market_data_base_url: BINANCE_API_BASE.to_string(),
            market_data_timeout_seconds: 5,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> AppConfig {
        let mut config = AppConfig::default();

        if let Ok(name) = std::env::var("APP_NAME") {
            if !name.trim().is_empty() {
                config.app_name = name;
            }
        }

        if let Ok(debug) = std::env::var("DEBUG") {
            config.debug = parse_flag(&debug);
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Ok(max_conn) = std::env::var("DATABASE_MAX_CONNECTIONS") {
            match max_conn.parse::<u32>() {
                Ok(value) if value > 0 => config.database_max_connections = value,
                _ => {
                    tracing::warn!(
                        "Invalid DATABASE_MAX_CONNECTIONS '{}', using default: {}",
                        max_conn,
                        config.database_max_connections
                    );
                }
            }
        }

        if let Ok(secret) = std::env::var("SECRET_KEY") {
            config.secret_key = Zeroizing::new(secret);
        }

        if let Ok(algorithm) = std::env::var("ALGORITHM") {
            config.algorithm = algorithm.trim().to_uppercase();
        }

        if let Ok(expire) = std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES") {
            match expire.parse::<i64>() {
                Ok(value) if value > 0 => config.access_token_expire_minutes = value,
                Ok(value) => {
                    tracing::warn!(
                        "Invalid ACCESS_TOKEN_EXPIRE_MINUTES value: {} (must be positive), using default: {}",
                        value,
                        config.access_token_expire_minutes
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse ACCESS_TOKEN_EXPIRE_MINUTES '{}': {}, using default: {}",
                        expire,
                        e,
                        config.access_token_expire_minutes
                    );
                }
            }
        }

        if let Ok(cost) = std::env::var("BCRYPT_COST") {
            if let Ok(value) = cost.parse::<u32>() {
                if (4..=31).contains(&value) {
                    config.bcrypt_cost = value;
                }
            }
        }

        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(value) = port.parse::<u16>() {
                config.port = value;
            }
        }

        if let Ok(origins) = std::env::var("ALLOWED_ORIGINS") {
            config.allowed_origins = origins;
        }

        if let Ok(timeout) = std::env::var("REQUEST_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse::<u64>() {
                if (1..=300).contains(&value) {
                    config.request_timeout_seconds = value;
                }
            }
        }

        if let Ok(url) = std::env::var("MARKET_DATA_BASE_URL") {
            config.market_data_base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(timeout) = std::env::var("MARKET_DATA_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse::<u64>() {
                // Upstream calls must never hold a caller for long
                if (1..=30).contains(&value) {
                    config.market_data_timeout_seconds = value;
                }
            }
        }

        config
    }

    /// Parse the comma-separated allowed origins list
    pub fn cors_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .map(|origin| origin.to_string())
            .collect()
    }

    /// Log warnings for settings that are unsafe outside local development
    pub fn warn_insecure_defaults(&self) {
        if self.secret_key.as_str() == DEFAULT_SECRET_KEY {
            tracing::warn!("SECRET_KEY is not set, tokens are signed with the built-in placeholder secret");
        } else if self.secret_key.len() < MIN_SECRET_LENGTH {
            tracing::warn!(
                "SECRET_KEY is weak (length: {}, recommended minimum: {})",
                self.secret_key.len(),
                MIN_SECRET_LENGTH
            );
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
