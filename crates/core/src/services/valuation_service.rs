use std::collections::HashMap;

use crate::models::holding::{AllocationBy, AllocationSlice, Holding, PortfolioStats};
use crate::models::price::{PriceBook, PriceQuote};
use crate::models::realized::{RealizedPosition, RealizedSummary};

/// Marks holdings to market and aggregates them.
///
/// Works in each holding's native currency; nothing here converts between
/// TWD and USD.
pub struct ValuationService;

impl ValuationService {
    pub fn new() -> Self {
        Self
    }

    /// Fill price-dependent fields of every holding from the price book.
    pub fn apply_prices(&self, holdings: &mut [Holding], prices: &PriceBook) {
        for holding in holdings.iter_mut() {
            let quote = prices.get(&holding.symbol).copied();
            self.revalue(holding, quote);
        }
    }

    /// Recompute market value, unrealized P/L and day change for one holding.
    /// Without a quote the holding is valued at its average cost.
    pub fn revalue(&self, holding: &mut Holding, quote: Option<PriceQuote>) {
        let current = quote.map(|q| q.current);
        let price = current.unwrap_or(holding.avg_cost);

        holding.current_price = current;
        holding.market_value = holding.shares * price;
        holding.unrealized_pl = holding.market_value - holding.total_cost;
        holding.unrealized_pl_percent = if holding.total_cost > 0.0 {
            holding.unrealized_pl / holding.total_cost * 100.0
        } else {
            0.0
        };

        match quote.and_then(|q| q.previous_close.map(|prev| (q.current, prev))) {
            Some((current, prev)) if prev != 0.0 => {
                let change = current - prev;
                holding.day_change = Some(change * holding.shares);
                holding.day_change_percent = Some(change / prev * 100.0);
            }
            _ => {
                holding.day_change = None;
                holding.day_change_percent = None;
            }
        }
    }

    /// Aggregate current holdings plus the realized total.
    pub fn portfolio_stats(&self, holdings: &[Holding], total_realized_pl: f64) -> PortfolioStats {
        let mut total_value = 0.0;
        let mut total_cost = 0.0;
        let mut total_unrealized_pl = 0.0;

        for holding in holdings {
            // shares × avg_cost is the remaining basis; use it as stored.
            total_value += holding.market_value;
            total_cost += holding.total_cost;
            total_unrealized_pl += holding.market_value - holding.total_cost;
        }

        PortfolioStats {
            total_value,
            total_cost,
            total_unrealized_pl,
            total_unrealized_pl_percent: if total_cost > 0.0 {
                total_unrealized_pl / total_cost * 100.0
            } else {
                0.0
            },
            total_realized_pl,
        }
    }

    /// Market value breakdown by symbol or broker, largest first.
    pub fn allocation(&self, holdings: &[Holding], by: AllocationBy) -> Vec<AllocationSlice> {
        let mut order: Vec<String> = Vec::new();
        let mut values: HashMap<String, f64> = HashMap::new();

        for holding in holdings {
            let name = match by {
                AllocationBy::Symbol => holding.symbol.clone(),
                AllocationBy::Broker => holding.broker.to_string(),
            };
            if !values.contains_key(&name) {
                order.push(name.clone());
            }
            *values.entry(name).or_insert(0.0) += holding.market_value;
        }

        let total: f64 = values.values().sum();
        let mut slices: Vec<AllocationSlice> = order
            .into_iter()
            .map(|name| {
                let value = values.get(&name).copied().unwrap_or(0.0);
                AllocationSlice {
                    percent: if total > 0.0 { value / total * 100.0 } else { 0.0 },
                    name,
                    value,
                }
            })
            .collect();

        slices.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        slices
    }

    /// Group realized positions into short-term and long-term totals.
    pub fn realized_summary(&self, positions: &[RealizedPosition]) -> RealizedSummary {
        let mut summary = RealizedSummary::default();
        for position in positions {
            if position.is_short_term {
                summary.short_term.add(position);
            } else {
                summary.long_term.add(position);
            }
            summary.total.add(position);
        }
        summary
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new()
    }
}
