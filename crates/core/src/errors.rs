use thiserror::Error;

/// Unified error type for the entire stock-ledger-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Transaction Boundary ────────────────────────────────────────
    #[error("Transaction validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid trade date: {0}")]
    InvalidDate(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Duplicate transaction id: {0}")]
    DuplicateTransaction(String),

    // ── Ledger ──────────────────────────────────────────────────────
    #[error(
        "Oversell of {symbol} at {broker} on {date}: sell of {requested} exceeds {available} held"
    )]
    Oversell {
        symbol: String,
        broker: String,
        date: String,
        requested: f64,
        available: f64,
    },

    // ── Storage / File ──────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No quote provider available for {0}")]
    NoProvider(String),

    #[error("Price not available for {symbol}")]
    PriceNotAvailable { symbol: String },
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Quote endpoints carry the API token in the query string.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
