use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::price::PriceQuote;

/// Trait abstraction for market-data sources.
///
/// Each quote API (Finnhub, Yahoo Finance) implements this trait. The ledger
/// never calls a provider; only the price service does, and it writes the
/// results into a `PriceBook`.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Get the latest quote for a provider-qualified ticker
    /// (e.g., "AAPL", "0050.TW").
    async fn get_quote(&self, ticker: &str) -> Result<PriceQuote, CoreError>;
}
