use crate::auth::{hash_password, verify_password, TokenService};
use crate::domain::entities::user::UserRole;
use crate::domain::errors::AppError;
use crate::persistence::models::{CreateUser, UserRecord};
use crate::persistence::repository::UserRepository;
use crate::persistence::DbPool;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

/// Registration payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub password: String,
    pub full_name: Option<String>,
}

/// Bearer token handed out on login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

impl AccessToken {
    fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Credential and token service
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    tokens: TokenService,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(pool: DbPool, tokens: TokenService, bcrypt_cost: u32) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
            bcrypt_cost,
        }
    }

    /// Create a user and its empty portfolio.
    ///
    /// Fails with `Conflict` when the email or the username is taken.
    pub async fn register(&self, request: RegisterUser) -> Result<UserRecord, AppError> {
        request.validate()?;

        if self.users.get_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if self.users.get_by_username(&request.username).await?.is_some() {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let hashed_password = hash_password(request.password, self.bcrypt_cost).await?;

        // A concurrent registration can still win the race; the unique index
        // turns that into a Conflict as well
        let user = self
            .users
            .create_with_portfolio(CreateUser {
                email: request.email,
                username: request.username,
                hashed_password,
                full_name: request.full_name,
                role: UserRole::User,
                is_verified: false,
            })
            .await?;

        info!("Registered user {} ({})", user.id, user.username);
        Ok(user)
    }

    /// Check credentials and issue an access token
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AccessToken, AppError> {
        let invalid = || AppError::Unauthorized("Incorrect email or password".to_string());

        let Some(user) = self.users.get_by_email(email).await? else {
            warn!("Login attempt for unknown email");
            return Err(invalid());
        };

        if !verify_password(password.to_string(), user.hashed_password.clone()).await? {
            warn!("Failed login for user {}", user.id);
            return Err(invalid());
        }

        if !user.is_active {
            warn!("Login attempt for inactive user {}", user.id);
            return Err(AppError::Unauthorized("Inactive user".to_string()));
        }

        let token = self.tokens.issue(&user.email)?;
        info!("User {} logged in", user.id);
        Ok(AccessToken::bearer(token))
    }

    /// Map a bearer token back to an active user
    pub async fn resolve(&self, token: &str) -> Result<UserRecord, AppError> {
        let claims = self.tokens.verify(token).map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            AppError::from(e)
        })?;

        match self.users.get_by_email(&claims.sub).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AppError::Unauthorized("Could not validate credentials".to_string())),
        }
    }

    /// Remove the user and every record it owns
    pub async fn delete_account(&self, user_id: i64) -> Result<(), AppError> {
        if !self.users.delete_cascade(user_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        info!("Deleted account {}", user_id);
        Ok(())
    }
}
