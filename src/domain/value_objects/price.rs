use crate::domain::errors::ValidationError;

/// Strictly positive, finite price
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Price(f64);

impl Price {
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::InvalidPrice("price must be finite".to_string()));
        }
        if value > 0.0 {
            Ok(Price(value))
        } else {
            Err(ValidationError::InvalidPrice("price must be greater than 0".to_string()))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}
