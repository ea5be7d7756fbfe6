//! Create the demo account used for local development.
//!
//! Idempotent: exits successfully when the account already exists.
//! Override the defaults with `SEED_EMAIL`, `SEED_PASSWORD`, `SEED_USERNAME`
//! and `SEED_FULL_NAME`.

use tracing::{info, warn};
use tradeboard::application::services::auth_service::{AuthService, RegisterUser};
use tradeboard::auth::TokenService;
use tradeboard::config::AppConfig;
use tradeboard::domain::errors::AppError;
use tradeboard::persistence::{init_database, DatabaseConfig};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradeboard=info,seed_user=info".into()),
        )
        .init();

    let config = AppConfig::from_env();
    let pool = init_database(&DatabaseConfig::from_app_config(&config)).await?;
    let auth = AuthService::new(pool.clone(), TokenService::from_config(&config)?, config.bcrypt_cost);

    let request = RegisterUser {
        email: env_or("SEED_EMAIL", "test@example.com"),
        username: env_or("SEED_USERNAME", "testuser"),
        password: env_or("SEED_PASSWORD", "password123"),
        full_name: Some(env_or("SEED_FULL_NAME", "Test User")),
    };
    let email = request.email.clone();
    let password = request.password.clone();

    match auth.register(request).await {
        Ok(user) => {
            info!("Created demo user {} (id {})", user.email, user.id);
            println!("Email:    {}", email);
            println!("Password: {}", password);
        }
        Err(AppError::Conflict(reason)) => {
            warn!("Demo user not created: {}", reason);
        }
        Err(e) => return Err(e.into()),
    }

    pool.close().await;
    Ok(())
}
