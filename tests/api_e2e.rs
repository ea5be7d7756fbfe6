//! End-to-end tests driving the full router against an in-memory database.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use tradeboard::api::{router, AppState, MAX_BODY_BYTES};
use tradeboard::config::AppConfig;
use tradeboard::infrastructure::binance_client::{
    DailyClose, MarketDataError, MarketDataSource, Ticker,
};
use tradeboard::persistence::{init_database, DatabaseConfig};

/// Upstream that is always down
struct OfflineMarket;

#[async_trait]
impl MarketDataSource for OfflineMarket {
    async fn fetch_tickers(&self, _symbols: &[String]) -> Result<Vec<Ticker>, MarketDataError> {
        Err(MarketDataError::Transport("offline".to_string()))
    }

    async fn fetch_ticker(&self, _symbol: &str) -> Result<Ticker, MarketDataError> {
        Err(MarketDataError::Transport("offline".to_string()))
    }

    async fn fetch_daily_closes(&self, _symbol: &str, _days: u32) -> Result<Vec<DailyClose>, MarketDataError> {
        Err(MarketDataError::Transport("offline".to_string()))
    }
}

async fn app() -> Router {
    app_with(AppConfig::default()).await
}

async fn app_with(config: AppConfig) -> Router {
    let pool = init_database(&DatabaseConfig::in_memory()).await.unwrap();
    let config = AppConfig {
        bcrypt_cost: 4,
        ..config
    };
    let state = AppState::new(pool, &config, Arc::new(OfflineMarket)).unwrap();
    router(state, &config)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register and log in, returning the bearer token
async fn signup(app: &Router, name: &str) -> String {
    let (status, _) = call(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": format!("{}@example.com", name),
            "username": name,
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/login-json",
        None,
        Some(json!({ "email": format!("{}@example.com", name), "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

async fn add_key(app: &Router, token: &str) {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/trading/api-keys",
        Some(token),
        Some(json!({
            "exchange_name": "binance",
            "api_key": "AKIA1234567890XYZ",
            "api_secret": "shh",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["api_key"], "AKIA****0XYZ");
    assert!(body.get("api_secret").is_none());
}

fn trade(quantity: f64, price: Option<f64>) -> Value {
    json!({
        "symbol": "BTC/USDT",
        "order_type": "limit",
        "order_side": "buy",
        "quantity": quantity,
        "price": price,
    })
}

#[tokio::test]
async fn test_health_and_banner() {
    let app = app().await;

    let (status, body) = call(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy" }));

    let (status, body) = call(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn test_registration_and_login() {
    let app = app().await;
    let token = signup(&app, "alice").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "alice@example.com", "username": "alice2", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "other@example.com", "username": "alice", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "short@example.com", "username": "short", "password": "1234567" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "user");
    assert!(body.get("hashed_password").is_none());

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/login-json",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_form_login() {
    let app = app().await;
    signup(&app, "formuser").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=formuser%40example.com&password=password123"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["token_type"], "bearer");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = app().await;

    let (status, body) = call(&app, Method::GET, "/api/trading/trades", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);

    let (status, _) = call(&app, Method::GET, "/api/portfolio", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_trade_flow() {
    let app = app().await;
    let token = signup(&app, "trader").await;

    // No exchange credential yet
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/trading/trades",
        Some(&token),
        Some(trade(1.0, Some(100.0))),
    )
    .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(body["code"], 412);

    let (_, trades) = call(&app, Method::GET, "/api/trading/trades", Some(&token), None).await;
    assert_eq!(trades.as_array().unwrap().len(), 0);

    add_key(&app, &token).await;

    let (status, filled) = call(
        &app,
        Method::POST,
        "/api/trading/trades",
        Some(&token),
        Some(trade(2.0, Some(100.0))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(filled["order_status"], "filled");
    assert_eq!(filled["exchange_name"], "binance");
    assert_eq!(filled["filled_quantity"], 2.0);
    assert_eq!(filled["average_price"], 100.0);
    assert_eq!(filled["total_cost"], 200.0);
    assert!((filled["fee"].as_f64().unwrap() - 0.2).abs() < 1e-12);

    for qty in [3.0, 4.0] {
        call(&app, Method::POST, "/api/trading/trades", Some(&token), Some(trade(qty, None))).await;
    }

    let (status, latest) =
        call(&app, Method::GET, "/api/trading/trades?limit=1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest.as_array().unwrap().len(), 1);
    assert_eq!(latest[0]["quantity"], 4.0);

    let (_, all) = call(&app, Method::GET, "/api/trading/trades", Some(&token), None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let uri = format!("/api/trading/trades/{}", filled["id"]);
    let (status, _) = call(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let intruder = signup(&app, "intruder").await;
    let (status, _) = call(&app, Method::GET, &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_trade_input_is_rejected() {
    let app = app().await;
    let token = signup(&app, "sloppy").await;
    add_key(&app, &token).await;

    let mut bad_type = trade(1.0, None);
    bad_type["order_type"] = json!("iceberg");
    let (status, body) =
        call(&app, Method::POST, "/api/trading/trades", Some(&token), Some(bad_type)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("iceberg"));

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/trading/trades",
        Some(&token),
        Some(trade(0.0, None)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/trading/trades",
        Some(&token),
        Some(json!({ "symbol": "BTC/USDT" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        call(&app, Method::GET, "/api/trading/trades?limit=abc", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        call(&app, Method::GET, "/api/trading/trades?limit=0", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/trading/trades",
        Some(&token),
        Some(trade(1e200, Some(1e200))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        call(&app, Method::GET, "/api/trading/trades/abc", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_market_prices_fall_back() {
    let app = app().await;

    let (status, body) = call(&app, Method::GET, "/api/market/prices", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let symbols: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|coin| coin["symbol"].as_str().unwrap())
        .collect();
    assert_eq!(
        symbols,
        vec!["BTC", "ETH", "XRP", "BCH", "LTC", "ADA", "DOT", "LINK", "XLM", "BNB"]
    );
    assert_eq!(body[0]["current_price"], 39000.0);

    let (status, body) = call(&app, Method::GET, "/api/market/prices/BTC", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Coin BTC not found or API error");
}

#[tokio::test]
async fn test_portfolio_strategies_and_alerts() {
    let app = app().await;
    let token = signup(&app, "investor").await;

    let (status, portfolio) = call(&app, Method::GET, "/api/portfolio", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(portfolio["total_value_usd"], 0.0);
    assert_eq!(portfolio["holdings"].as_array().unwrap().len(), 0);

    let (status, holding) = call(
        &app,
        Method::PUT,
        "/api/portfolio/holdings",
        Some(&token),
        Some(json!({ "symbol": "eth", "quantity": 2.0, "average_buy_price": 1000.0, "current_price": 1500.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(holding["symbol"], "ETH");
    assert_eq!(holding["profit_loss"], 1000.0);

    let (_, portfolio) = call(&app, Method::GET, "/api/portfolio", Some(&token), None).await;
    assert_eq!(portfolio["total_value_usd"], 3000.0);
    assert_eq!(portfolio["total_profit_loss_percentage"], 50.0);

    let (status, strategy) = call(
        &app,
        Method::POST,
        "/api/strategies",
        Some(&token),
        Some(json!({ "name": "dip buyer", "strategy_type": "mean_reversion", "parameters": "{\"window\": 20}" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(strategy["status"], "paused");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/alerts",
        Some(&token),
        Some(json!({ "symbol": "BTC", "alert_type": "price_above", "target_price": 50000.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/strategies/{}", strategy["id"]);
    let (status, _) = call(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_account_deletion() {
    let app = app().await;
    let token = signup(&app, "leaver").await;
    add_key(&app, &token).await;
    call(&app, Method::POST, "/api/trading/trades", Some(&token), Some(trade(1.0, Some(5.0)))).await;
    call(
        &app,
        Method::POST,
        "/api/alerts",
        Some(&token),
        Some(json!({ "symbol": "BTC", "alert_type": "price_below", "target_price": 1.0 })),
    )
    .await;

    let (status, _) = call(&app, Method::DELETE, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/login-json",
        None,
        Some(json!({ "email": "leaver@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Email and username are free again
    signup(&app, "leaver").await;
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = app().await;
    let payload = format!(
        r#"{{"email":"big@example.com","username":"big","password":"{}"}}"#,
        "x".repeat(MAX_BODY_BYTES)
    );

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_wildcard_origin_allows_any_origin() {
    let app = app_with(AppConfig {
        allowed_origins: "*".to_string(),
        ..AppConfig::default()
    })
    .await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/health")
        .header(header::ORIGIN, "https://dashboard.example.org")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
        .is_none());
}

#[tokio::test]
async fn test_listed_origin_is_echoed_with_credentials() {
    let app = app_with(AppConfig {
        allowed_origins: "http://localhost:5173".to_string(),
        ..AppConfig::default()
    })
    .await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}
