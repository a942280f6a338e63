use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::holding::{Holding, PortfolioStats};
use super::realized::{RealizedPosition, RealizedSummary};
use super::transaction::Broker;

/// Part of a sell that found no lots to consume. Only produced under
/// `OversellPolicy::Clamp`; the default policy fails instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedSell {
    pub transaction_id: String,
    pub symbol: String,
    pub broker: Broker,
    pub date: NaiveDate,
    pub unmatched_shares: f64,
}

/// Output of one ledger replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReport {
    /// Open positions in first-appearance order of their (symbol, broker)
    pub holdings: Vec<Holding>,

    /// Lot-consumption events in replay order
    pub realized_positions: Vec<RealizedPosition>,

    #[serde(rename = "totalRealizedPL")]
    pub total_realized_pl: f64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmatched_sells: Vec<UnmatchedSell>,
}

/// Everything a dashboard needs, computed in one pass from the log and the
/// current price book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub holdings: Vec<Holding>,
    pub realized_positions: Vec<RealizedPosition>,
    pub stats: PortfolioStats,
    pub realized_summary: RealizedSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmatched_sells: Vec<UnmatchedSell>,
}
