use serde::{Deserialize, Serialize};

use super::transaction::{Broker, Currency};

/// An open position for one (symbol, broker) pair, derived from the
/// remaining lots. Recomputed from the full transaction log on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub symbol: String,
    pub broker: Broker,
    pub currency: Currency,

    /// Sum of remaining lot quantities
    pub shares: f64,

    /// total_cost / shares
    pub avg_cost: f64,

    /// Remaining cost basis, including the unconsumed share of buy fees
    pub total_cost: f64,

    /// Latest known price; `None` when no quote has been supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,

    /// shares × (current_price ?? avg_cost)
    pub market_value: f64,

    #[serde(rename = "unrealizedPL")]
    pub unrealized_pl: f64,

    #[serde(rename = "unrealizedPLPercent")]
    pub unrealized_pl_percent: f64,

    /// (current − previous close) × shares; needs both prices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_change: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_change_percent: Option<f64>,
}

impl Holding {
    /// Build an unpriced holding from a remaining basis. Market value falls
    /// back to cost until a quote is applied.
    pub fn from_basis(
        symbol: impl Into<String>,
        broker: Broker,
        currency: Currency,
        shares: f64,
        total_cost: f64,
    ) -> Self {
        let avg_cost = if shares > 0.0 { total_cost / shares } else { 0.0 };
        Self {
            symbol: symbol.into(),
            broker,
            currency,
            shares,
            avg_cost,
            total_cost,
            current_price: None,
            market_value: shares * avg_cost,
            unrealized_pl: shares * avg_cost - total_cost,
            unrealized_pl_percent: 0.0,
            day_change: None,
            day_change_percent: None,
        }
    }
}

/// Portfolio-wide aggregate over the current holdings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioStats {
    pub total_value: f64,
    pub total_cost: f64,
    #[serde(rename = "totalUnrealizedPL")]
    pub total_unrealized_pl: f64,
    #[serde(rename = "totalUnrealizedPLPercent")]
    pub total_unrealized_pl_percent: f64,
    #[serde(rename = "totalRealizedPL")]
    pub total_realized_pl: f64,
}

/// Grouping key for allocation breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationBy {
    Symbol,
    Broker,
}

/// One slice of an allocation breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSlice {
    pub name: String,
    pub value: f64,
    /// value / total × 100
    pub percent: f64,
}
