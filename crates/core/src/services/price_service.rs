use log::{debug, warn};

use crate::errors::CoreError;
use crate::models::price::{PriceBook, PriceQuote};
use crate::providers::registry::QuoteProviderRegistry;

/// Fetches latest quotes from the registered providers.
///
/// Fetching takes `&self` and returns results instead of writing them, so
/// several refresh cycles can be in flight at once; each cycle applies its
/// results to the `PriceBook` in one step and the last write for a symbol
/// wins.
pub struct PriceService {
    registry: QuoteProviderRegistry,
}

impl PriceService {
    pub fn new(registry: QuoteProviderRegistry) -> Self {
        Self { registry }
    }

    /// Check if at least one provider is registered.
    pub fn has_providers(&self) -> bool {
        !self.registry.is_empty()
    }

    /// Get the names of all registered providers, in priority order.
    pub fn get_provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Provider tickers to try for a ledger symbol.
    ///
    /// Taiwan listings are recorded as bare digits ("50", "2330"); they are
    /// zero-padded to four digits and tried on the main board (`.TW`) before
    /// the OTC market (`.TWO`). Anything else is used as-is.
    pub fn quote_candidates(symbol: &str) -> Vec<String> {
        let symbol = symbol.trim().to_uppercase();
        if !symbol.is_empty() && symbol.chars().all(|c| c.is_ascii_digit()) {
            let padded = format!("{symbol:0>4}");
            vec![format!("{padded}.TW"), format!("{padded}.TWO")]
        } else {
            vec![symbol]
        }
    }

    /// Fetch the latest quote for one ledger symbol with automatic fallback
    /// across providers and listing candidates.
    pub async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote, CoreError> {
        let providers = self.registry.providers();
        if providers.is_empty() {
            return Err(CoreError::NoProvider(symbol.to_string()));
        }

        let candidates = Self::quote_candidates(symbol);
        let mut last_error = None;

        for provider in &providers {
            for ticker in &candidates {
                match provider.get_quote(ticker).await {
                    Ok(quote) if quote.current.is_finite() && quote.current > 0.0 => {
                        debug!("{} quoted {ticker} at {}", provider.name(), quote.current);
                        return Ok(quote);
                    }
                    Ok(quote) => {
                        last_error = Some(CoreError::Api {
                            provider: provider.name().to_string(),
                            message: format!(
                                "Invalid price returned for {ticker}: {} (must be finite and positive)",
                                quote.current
                            ),
                        });
                    }
                    Err(e) => {
                        last_error = Some(e);
                        // Try next candidate / provider
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::PriceNotAvailable {
            symbol: symbol.to_string(),
        }))
    }

    /// Fetch quotes for many symbols. Each symbol gets its own result; one
    /// failure does not abort the batch.
    pub async fn fetch_quotes(&self, symbols: &[String]) -> Vec<(String, Result<PriceQuote, CoreError>)> {
        let mut results = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let result = self.fetch_quote(symbol).await;
            results.push((symbol.clone(), result));
        }
        results
    }

    /// Fetch quotes for `symbols` and store the successes in `book`.
    /// Returns the number of quotes stored; failures are logged and skipped.
    pub async fn refresh(&self, book: &mut PriceBook, symbols: &[String]) -> usize {
        let results = self.fetch_quotes(symbols).await;
        let fetched = results.into_iter().filter_map(|(symbol, result)| match result {
            Ok(quote) => Some((symbol, quote)),
            Err(e) => {
                warn!("Failed to fetch price for {symbol}: {e}");
                None
            }
        });
        book.apply(fetched)
    }
}
