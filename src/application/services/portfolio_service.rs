use crate::domain::entities::portfolio::HoldingValuation;
use crate::domain::errors::{AppError, ValidationError};
use crate::domain::value_objects::{price::Price, quantity::Quantity};
use crate::persistence::account_repository::PortfolioRepository;
use crate::persistence::models::{HoldingRecord, PortfolioRecord, UpsertHolding};
use crate::persistence::DbPool;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Holding payload; the current price defaults to the average buy price
#[derive(Debug, Clone, Deserialize)]
pub struct SetHolding {
    pub symbol: String,
    pub quantity: f64,
    pub average_buy_price: f64,
    pub current_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioView {
    #[serde(flatten)]
    pub portfolio: PortfolioRecord,
    pub holdings: Vec<HoldingRecord>,
}

fn normalize_symbol(symbol: &str) -> Result<String, ValidationError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ValidationError::InvalidSymbol("symbol is required".to_string()));
    }
    Ok(symbol)
}

#[derive(Clone)]
pub struct PortfolioService {
    portfolios: PortfolioRepository,
}

impl PortfolioService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            portfolios: PortfolioRepository::new(pool),
        }
    }

    async fn portfolio_of(&self, user_id: i64) -> Result<PortfolioRecord, AppError> {
        self.portfolios
            .get_for_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Portfolio not found".to_string()))
    }

    pub async fn get_portfolio(&self, user_id: i64) -> Result<PortfolioView, AppError> {
        let portfolio = self.portfolio_of(user_id).await?;
        let holdings = self.portfolios.list_holdings(portfolio.id).await?;
        Ok(PortfolioView { portfolio, holdings })
    }

    /// Set the caller's position in one symbol and re-roll the totals
    pub async fn set_holding(&self, user_id: i64, request: SetHolding) -> Result<HoldingRecord, AppError> {
        let symbol = normalize_symbol(&request.symbol)?;
        let quantity = Quantity::new(request.quantity)?;
        let average_buy_price = Price::new(request.average_buy_price)?;
        let current_price = request.current_price.map(Price::new).transpose()?;

        let valuation = HoldingValuation::compute(quantity, average_buy_price, current_price);
        let portfolio = self.portfolio_of(user_id).await?;

        let holding = self
            .portfolios
            .upsert_holding(
                portfolio.id,
                UpsertHolding {
                    symbol,
                    quantity: quantity.value(),
                    average_buy_price: average_buy_price.value(),
                    current_price: valuation.current_price,
                    total_value_usd: valuation.total_value_usd,
                    profit_loss: valuation.profit_loss,
                    profit_loss_percentage: valuation.profit_loss_percentage,
                },
            )
            .await?;

        info!("User {} set holding {} = {}", user_id, holding.symbol, holding.quantity);
        Ok(holding)
    }

    pub async fn remove_holding(&self, user_id: i64, symbol: &str) -> Result<(), AppError> {
        let symbol = normalize_symbol(symbol)?;
        let portfolio = self.portfolio_of(user_id).await?;

        if !self.portfolios.remove_holding(portfolio.id, &symbol).await? {
            return Err(AppError::NotFound(format!("No holding for {}", symbol)));
        }
        Ok(())
    }
}
