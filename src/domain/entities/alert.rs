use crate::domain::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AlertType {
    PriceAbove,
    PriceBelow,
}

impl FromStr for AlertType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price_above" => Ok(AlertType::PriceAbove),
            "price_below" => Ok(AlertType::PriceBelow),
            _ => Err(ValidationError::UnknownVariant {
                field: "alert_type",
                value: s.to_string(),
                expected: "price_above, price_below",
            }),
        }
    }
}
