use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::normalize::{lenient_currency, lenient_f64, lenient_string, trade_date};

/// Type of transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Acquiring shares; opens a lot
    Buy,
    /// Disposing of shares; consumes lots oldest-first
    Sell,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Buy => write!(f, "Buy"),
            TransactionType::Sell => write!(f, "Sell"),
        }
    }
}

/// Settlement currency of a transaction. Informational only: the ledger
/// never converts between currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    TWD,
    USD,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::TWD => write!(f, "TWD"),
            Currency::USD => write!(f, "USD"),
        }
    }
}

/// Brokerage sub-account. Acts as a partition key: lots held at one broker
/// are never matched against sells at another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Broker {
    /// Fubon Securities, Taiwan market
    FubonTW,
    /// Fubon sub-brokerage for US listings
    FubonSub,
    /// Firstrade, US market
    Firstrade,
}

impl Broker {
    /// Currency a transaction settles in when the record does not say.
    pub fn default_currency(&self) -> Currency {
        match self {
            Broker::FubonTW => Currency::TWD,
            Broker::FubonSub | Broker::Firstrade => Currency::USD,
        }
    }

    pub fn all() -> [Broker; 3] {
        [Broker::FubonTW, Broker::FubonSub, Broker::Firstrade]
    }
}

impl std::fmt::Display for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Broker::FubonTW => write!(f, "FubonTW"),
            Broker::FubonSub => write!(f, "FubonSub"),
            Broker::Firstrade => write!(f, "Firstrade"),
        }
    }
}

/// A single executed trade. Immutable once recorded; edits replace the
/// record under the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Opaque unique identifier, never reused
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,

    /// Execution date (daily granularity)
    #[serde(with = "trade_date")]
    pub date: NaiveDate,

    pub broker: Broker,

    /// Ticker, uppercased (e.g., "AAPL", "2330")
    #[serde(deserialize_with = "lenient_string")]
    pub symbol: String,

    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    /// Quantity traded (positive)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub shares: f64,

    /// Per-share execution price in the transaction's currency
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,

    /// Total fee for the trade (commission + tax)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fee: f64,

    /// Missing on records written before currencies were tracked
    #[serde(
        default,
        deserialize_with = "lenient_currency",
        skip_serializing_if = "Option::is_none"
    )]
    pub currency: Option<Currency>,

    #[serde(default, alias = "note", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Transaction {
    pub fn new(
        transaction_type: TransactionType,
        broker: Broker,
        symbol: impl Into<String>,
        shares: f64,
        price: f64,
        fee: f64,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date,
            broker,
            symbol: normalize_symbol(&symbol.into()),
            transaction_type,
            shares,
            price,
            fee,
            currency: Some(broker.default_currency()),
            notes: None,
        }
    }

    pub fn buy(
        broker: Broker,
        symbol: impl Into<String>,
        shares: f64,
        price: f64,
        fee: f64,
        date: NaiveDate,
    ) -> Self {
        Self::new(TransactionType::Buy, broker, symbol, shares, price, fee, date)
    }

    pub fn sell(
        broker: Broker,
        symbol: impl Into<String>,
        shares: f64,
        price: f64,
        fee: f64,
        date: NaiveDate,
    ) -> Self {
        Self::new(TransactionType::Sell, broker, symbol, shares, price, fee, date)
    }

    /// Replace the generated id (records imported from a store keep theirs).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    /// Explicit currency, or the broker's settlement currency.
    pub fn currency(&self) -> Currency {
        self.currency.unwrap_or_else(|| self.broker.default_currency())
    }

    /// Gross trade value before fees.
    pub fn gross_value(&self) -> f64 {
        self.shares * self.price
    }
}

/// Canonical symbol form: trimmed and uppercased.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Sort order for transaction listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionSortOrder {
    /// Newest date first (default for display)
    DateDesc,
    /// Oldest date first
    DateAsc,
    /// Alphabetical by symbol
    SymbolAsc,
    /// Largest gross value first
    ValueDesc,
}
