use thiserror::Error;

/// Errors surfaced at the service boundary.
///
/// Every variant maps onto one HTTP status code; none of them are retried
/// internally.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AppError {
    /// Duplicate registration (email or username)
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials, or a missing/invalid/expired token
    #[error("{0}")]
    Unauthorized(String),

    /// Operation requires state the caller has not set up (e.g. exchange keys)
    #[error("{0}")]
    PreconditionFailed(String),

    /// Unknown or foreign resource
    #[error("{0}")]
    NotFound(String),

    /// Input failed validation
    #[error("{0}")]
    BadRequest(String),

    /// Storage, hashing or other server-side fault
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Numeric HTTP status for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) => 400,
            AppError::Unauthorized(_) => 401,
            AppError::NotFound(_) => 404,
            AppError::Conflict(_) => 409,
            AppError::PreconditionFailed(_) => 412,
            AppError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code attached to error logs
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::PreconditionFailed(_) => "PRECONDITION_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Caller mistakes; their message is safe to echo back
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AppError::Internal(_))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Invalid {field}: '{value}' (expected one of: {expected})")]
    UnknownVariant {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{0}")]
    InvalidField(String),

    #[error("Value must be positive")]
    MustBePositive,
}

impl From<ValidationError> for AppError {
    fn from(error: ValidationError) -> Self {
        AppError::BadRequest(error.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(format!("Validation failed: {}", errors))
    }
}
