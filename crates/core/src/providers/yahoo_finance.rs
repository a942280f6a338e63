use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::price::PriceQuote;
use super::traits::QuoteProvider;

/// Yahoo Finance quote provider.
///
/// - **Free**: No API key required.
/// - **Coverage**: US equities and Taiwan listings (`.TW` main board,
///   `.TWO` OTC).
///
/// The previous close is the second-to-last daily bar of a five-day window;
/// the last bar is the current (possibly intraday) price.
///
/// **Note**: Not WASM-compatible (uses native reqwest/tokio).
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }
}

#[async_trait]
impl QuoteProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn get_quote(&self, ticker: &str) -> Result<PriceQuote, CoreError> {
        let resp = self
            .connector
            .get_quote_range(ticker, "1d", "5d")
            .await
            .map_err(|e| CoreError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("Failed to fetch quotes for {ticker}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("No quote data for {ticker}: {e}"),
        })?;

        let mut closes = quotes.iter().rev().map(|q| q.close).filter(|c| c.is_finite() && *c > 0.0);
        let current = closes.next().ok_or_else(|| CoreError::PriceNotAvailable {
            symbol: ticker.to_string(),
        })?;

        Ok(PriceQuote::new(current, closes.next()))
    }
}
