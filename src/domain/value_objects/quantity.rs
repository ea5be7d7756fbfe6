use crate::domain::errors::ValidationError;

/// Strictly positive, finite order quantity
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Quantity(f64);

impl Quantity {
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::InvalidQuantity(
                "quantity must be finite".to_string(),
            ));
        }
        if value > 0.0 {
            Ok(Quantity(value))
        } else {
            Err(ValidationError::InvalidQuantity(
                "quantity must be greater than 0".to_string(),
            ))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}
