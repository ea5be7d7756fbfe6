//! HTTP surface: shared state, route table and middleware stack.

use crate::application::handlers::{
    alert_handler, auth_handler, market_handler, portfolio_handler, strategy_handler,
    trading_handler,
};
use crate::application::handlers::extract::ErrorResponse;
use crate::application::services::{
    alert_service::AlertService, auth_service::AuthService, market_service::MarketService,
    portfolio_service::PortfolioService, strategy_service::StrategyService,
    trading_service::TradingService,
};
use crate::auth::{require_auth, TokenError, TokenService};
use crate::config::AppConfig;
use crate::domain::errors::AppError;
use crate::domain::services::execution_venue::SimulatedVenue;
use crate::infrastructure::binance_client::MarketDataSource;
use crate::persistence::DbPool;
use axum::{
    error_handling::HandleErrorLayer,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    BoxError, Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::warn;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Handles shared by every request
#[derive(Clone)]
pub struct AppState {
    pub app_name: Arc<str>,
    pub auth: AuthService,
    pub trading: TradingService,
    pub market: MarketService,
    pub portfolio: PortfolioService,
    pub strategies: StrategyService,
    pub alerts: AlertService,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        config: &AppConfig,
        market_source: Arc<dyn MarketDataSource>,
    ) -> Result<Self, TokenError> {
        let tokens = TokenService::from_config(config)?;

        Ok(Self {
            app_name: Arc::from(config.app_name.as_str()),
            auth: AuthService::new(pool.clone(), tokens, config.bcrypt_cost),
            trading: TradingService::new(pool.clone(), Arc::new(SimulatedVenue::new())),
            market: MarketService::new(market_source),
            portfolio: PortfolioService::new(pool.clone()),
            strategies: StrategyService::new(pool.clone()),
            alerts: AlertService::new(pool),
        })
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    let configured = config.cors_origins();
    if configured.iter().any(|origin| origin == "*") {
        // Browsers refuse credentials alongside a wildcard origin
        warn!("ALLOWED_ORIGINS contains '*', allowing any origin without credentials");
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = configured
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(origins).allow_credentials(true)
}

/// Render middleware failures in the usual error envelope
async fn handle_middleware_error(error: BoxError) -> Response {
    if error.is::<tower::timeout::error::Elapsed>() {
        warn!("Request timed out");
        let status = StatusCode::REQUEST_TIMEOUT;
        return (
            status,
            Json(ErrorResponse {
                error: "Request timed out".to_string(),
                code: status.as_u16(),
            }),
        )
            .into_response();
    }
    AppError::Internal(format!("middleware failure: {}", error)).into_response()
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": state.app_name.as_ref(),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Build the application router
pub fn router(state: AppState, config: &AppConfig) -> Router {
    let protected = Router::new()
        .route(
            "/api/auth/me",
            get(auth_handler::me).delete(auth_handler::delete_me),
        )
        .route(
            "/api/trading/trades",
            post(trading_handler::create_trade).get(trading_handler::list_trades),
        )
        .route("/api/trading/trades/:id", get(trading_handler::get_trade))
        .route(
            "/api/trading/api-keys",
            post(trading_handler::create_api_key).get(trading_handler::list_api_keys),
        )
        .route(
            "/api/trading/api-keys/:id",
            delete(trading_handler::delete_api_key),
        )
        .route("/api/portfolio", get(portfolio_handler::get_portfolio))
        .route("/api/portfolio/holdings", put(portfolio_handler::put_holding))
        .route(
            "/api/portfolio/holdings/:symbol",
            delete(portfolio_handler::delete_holding),
        )
        .route(
            "/api/strategies",
            post(strategy_handler::create_strategy).get(strategy_handler::list_strategies),
        )
        .route(
            "/api/strategies/:id",
            get(strategy_handler::get_strategy).delete(strategy_handler::delete_strategy),
        )
        .route(
            "/api/alerts",
            post(alert_handler::create_alert).get(alert_handler::list_alerts),
        )
        .route("/api/alerts/:id", delete(alert_handler::delete_alert))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .route("/api/auth/register", post(auth_handler::register))
        .route("/api/auth/login", post(auth_handler::login))
        .route("/api/auth/login-json", post(auth_handler::login_json))
        .route("/api/market/prices", get(market_handler::list_prices))
        .route("/api/market/prices/:symbol", get(market_handler::get_price))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(config))
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_seconds,
                ))),
        )
        .with_state(state)
}
