//! Portfolio valuation
//!
//! Holdings are an independent data set: values here are computed from the
//! holding's own quantity and price snapshot, never from the trade ledger.

use crate::domain::value_objects::{price::Price, quantity::Quantity};

/// Computed value and profit/loss of a single holding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldingValuation {
    pub current_price: f64,
    pub total_value_usd: f64,
    pub profit_loss: f64,
    pub profit_loss_percentage: f64,
}

impl HoldingValuation {
    /// Value a holding; the current price defaults to the average buy price
    pub fn compute(quantity: Quantity, average_buy_price: Price, current_price: Option<Price>) -> Self {
        let current = current_price.unwrap_or(average_buy_price).value();
        let avg = average_buy_price.value();
        let qty = quantity.value();

        let total_value_usd = qty * current;
        let profit_loss = (current - avg) * qty;
        let profit_loss_percentage = (current - avg) / avg * 100.0;

        HoldingValuation {
            current_price: current,
            total_value_usd,
            profit_loss,
            profit_loss_percentage,
        }
    }
}

/// Portfolio-level rollup
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PortfolioTotals {
    pub total_value_usd: f64,
    pub total_profit_loss: f64,
    pub total_profit_loss_percentage: f64,
}

impl PortfolioTotals {
    /// Roll up `(total_value_usd, profit_loss)` pairs of every holding
    pub fn from_holdings<I>(holdings: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let (value, pnl) = holdings
            .into_iter()
            .fold((0.0, 0.0), |(v, p), (hv, hp)| (v + hv, p + hp));

        let cost_basis = value - pnl;
        let pct = if cost_basis > 0.0 { pnl / cost_basis * 100.0 } else { 0.0 };

        PortfolioTotals {
            total_value_usd: value,
            total_profit_loss: pnl,
            total_profit_loss_percentage: pct,
        }
    }
}
