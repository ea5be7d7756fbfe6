//! Execution Venue
//!
//! Seam between trade recording and order execution. The only venue shipped
//! is [`SimulatedVenue`], which fills every order synchronously at the
//! requested price. A live venue would report asynchronously and could reject.

use crate::domain::entities::trade::{OrderStatus, TradeOrder};

/// Flat taker fee applied to simulated fills (0.1%)
pub const SIMULATED_FEE_RATE: f64 = 0.001;

/// Outcome of handing an order to a venue
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub status: OrderStatus,
    pub filled_quantity: f64,
    pub average_price: f64,
    pub total_cost: f64,
    pub fee: f64,
    pub exchange_order_id: Option<String>,
}

pub trait ExecutionVenue: Send + Sync {
    fn execute(&self, order: &TradeOrder) -> ExecutionReport;
}

/// Deterministic in-process fill: no exchange is contacted
#[derive(Debug, Clone, Default)]
pub struct SimulatedVenue;

impl SimulatedVenue {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionVenue for SimulatedVenue {
    fn execute(&self, order: &TradeOrder) -> ExecutionReport {
        let filled_quantity = order.quantity.value();
        // Market orders without a price are recorded at zero
        let average_price = order.price.map(|p| p.value()).unwrap_or(0.0);
        let total_cost = filled_quantity * average_price;
        let fee = total_cost * SIMULATED_FEE_RATE;

        ExecutionReport {
            status: OrderStatus::Filled,
            filled_quantity,
            average_price,
            total_cost,
            fee,
            exchange_order_id: Some(format!("SIM-{}", uuid::Uuid::new_v4())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_fill_arithmetic() {
        let order = TradeOrder::new("BTC/USDT", "limit", "buy", 2.0, Some(100.0)).unwrap();
        let report = SimulatedVenue::new().execute(&order);

        assert_eq!(report.status, OrderStatus::Filled);
        assert_eq!(report.filled_quantity, 2.0);
        assert_eq!(report.average_price, 100.0);
        assert_eq!(report.total_cost, 200.0);
        assert!((report.fee - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_market_order_without_price_fills_at_zero() {
        let order = TradeOrder::new("ETH/USDT", "market", "sell", 3.0, None).unwrap();
        let report = SimulatedVenue::new().execute(&order);

        assert_eq!(report.filled_quantity, 3.0);
        assert_eq!(report.average_price, 0.0);
        assert_eq!(report.total_cost, 0.0);
        assert_eq!(report.fee, 0.0);
    }

    #[test]
    fn test_simulated_order_ids_are_unique() {
        let order = TradeOrder::new("ETH/USDT", "market", "buy", 1.0, None).unwrap();
        let venue = SimulatedVenue::new();
        let a = venue.execute(&order).exchange_order_id.unwrap();
        let b = venue.execute(&order).exchange_order_id.unwrap();
        assert!(a.starts_with("SIM-"));
        assert_ne!(a, b);
    }
}
