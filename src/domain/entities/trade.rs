use crate::domain::errors::ValidationError;
use crate::domain::value_objects::{price::Price, quantity::Quantity};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Longest symbol accepted by the trades table
const MAX_SYMBOL_LENGTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    TakeProfit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
            OrderType::StopLoss => "stop_loss",
            OrderType::TakeProfit => "take_profit",
        }
    }
}

impl FromStr for OrderType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            "stop_loss" => Ok(OrderType::StopLoss),
            "take_profit" => Ok(OrderType::TakeProfit),
            _ => Err(ValidationError::UnknownVariant {
                field: "order_type",
                value: s.to_string(),
                expected: "market, limit, stop_loss, take_profit",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl FromStr for OrderSide {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            _ => Err(ValidationError::UnknownVariant {
                field: "order_side",
                value: s.to_string(),
                expected: "buy, sell",
            }),
        }
    }
}

/// Lifecycle of a trade row.
///
/// `Pending` may move to any other state; `Filled`, `Cancelled` and `Failed`
/// are terminal. A partial fill can still complete, be cancelled or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Filled,
    PartiallyFilled,
    Cancelled,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Filled => "filled",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Failed
        )
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match self {
            OrderStatus::Pending => next != OrderStatus::Pending,
            OrderStatus::PartiallyFilled => next.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated trade request, ready to be recorded
#[derive(Debug, Clone)]
pub struct TradeOrder {
    pub symbol: String,
    pub order_type: OrderType,
    pub order_side: OrderSide,
    pub quantity: Quantity,
    pub price: Option<Price>,
}

impl TradeOrder {
    pub fn new(
        symbol: &str,
        order_type: &str,
        order_side: &str,
        quantity: f64,
        price: Option<f64>,
    ) -> Result<Self, ValidationError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(ValidationError::InvalidSymbol("symbol is required".to_string()));
        }
        if symbol.len() > MAX_SYMBOL_LENGTH {
            return Err(ValidationError::InvalidSymbol(format!(
                "symbol longer than {} characters",
                MAX_SYMBOL_LENGTH
            )));
        }

        let order_type = order_type.parse::<OrderType>()?;
        let order_side = order_side.parse::<OrderSide>()?;
        let quantity = Quantity::new(quantity)?;
        let price = price.map(Price::new).transpose()?;

        if let Some(price) = price {
            if !(quantity.value() * price.value()).is_finite() {
                return Err(ValidationError::InvalidField(
                    "order notional is too large".to_string(),
                ));
            }
        }

        Ok(TradeOrder {
            symbol: symbol.to_string(),
            order_type,
            order_side,
            quantity,
            price,
        })
    }
}
