use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::transaction::{Broker, Currency};

/// One lot-consumption event: a slice of a sell matched against a slice of
/// one earlier buy. A sell spanning several lots yields several entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizedPosition {
    pub symbol: String,
    pub broker: Broker,
    pub currency: Currency,

    /// Shares taken from the lot by this event
    pub quantity: f64,

    pub date_acquired: NaiveDate,
    pub date_sold: NaiveDate,

    /// Whole days between acquisition and sale
    pub days_held: i64,

    pub acquisition_price: f64,
    /// Share of the original buy fee attributable to `quantity`
    pub acquisition_fee: f64,
    pub sale_price: f64,
    /// Share of the sell fee attributable to `quantity`
    pub sale_fee: f64,

    /// acquisition_price × quantity + acquisition_fee
    pub adjusted_cost: f64,
    /// sale_price × quantity − sale_fee
    pub sales_proceeds: f64,
    /// sales_proceeds − adjusted_cost
    pub net_gain_loss: f64,
    /// net_gain_loss / adjusted_cost × 100, 0 when the cost is 0
    pub gain_loss_percent: f64,

    /// Held fewer than 365 days
    pub is_short_term: bool,
}

/// Running totals for one holding-period bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizedBucket {
    pub count: usize,
    pub sales_proceeds: f64,
    pub adjusted_cost: f64,
    pub net_gain_loss: f64,
}

impl RealizedBucket {
    pub(crate) fn add(&mut self, position: &RealizedPosition) {
        self.count += 1;
        self.sales_proceeds += position.sales_proceeds;
        self.adjusted_cost += position.adjusted_cost;
        self.net_gain_loss += position.net_gain_loss;
    }
}

/// Realized positions grouped by holding period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizedSummary {
    pub short_term: RealizedBucket,
    pub long_term: RealizedBucket,
    pub total: RealizedBucket,
}
