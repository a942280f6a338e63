use crate::models::transaction::{Broker, TransactionType};

/// FubonTW commission rate (0.1425%).
const FUBON_TW_COMMISSION: f64 = 0.001425;

/// FubonTW minimum commission on buys, in TWD.
const FUBON_TW_MIN_COMMISSION: f64 = 20.0;

/// Taiwan securities transaction tax on sells (0.3%).
const TW_TRANSACTION_TAX: f64 = 0.003;

/// FubonSub flat rate (0.25%).
const FUBON_SUB_RATE: f64 = 0.0025;

/// Per-broker fee schedule used to pre-fill the fee of a new transaction.
///
/// A pricing-policy lookup only; recorded transactions carry their actual
/// fee and the ledger never recomputes it.
pub struct FeeService;

impl FeeService {
    pub fn new() -> Self {
        Self
    }

    /// Expected total fee (commission + tax) for a trade, in the broker's
    /// settlement currency.
    pub fn estimate(&self, broker: Broker, transaction_type: TransactionType, shares: f64, price: f64) -> f64 {
        let value = shares * price;
        if !value.is_finite() || value <= 0.0 {
            return 0.0;
        }

        match broker {
            Broker::Firstrade => 0.0,
            Broker::FubonSub => (value * FUBON_SUB_RATE).round(),
            Broker::FubonTW => {
                let commission = (value * FUBON_TW_COMMISSION).floor();
                match transaction_type {
                    TransactionType::Buy => commission.max(FUBON_TW_MIN_COMMISSION),
                    TransactionType::Sell => commission + (value * TW_TRANSACTION_TAX).floor(),
                }
            }
        }
    }
}

impl Default for FeeService {
    fn default() -> Self {
        Self::new()
    }
}
