use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::CoreError;

/// Latest market data for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub current: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<f64>,
}

impl PriceQuote {
    pub fn new(current: f64, previous_close: Option<f64>) -> Self {
        Self {
            current,
            previous_close,
        }
    }
}

/// Symbol → latest quote. Keyed by uppercased symbol and shared across
/// brokers (the same ticker has one market price).
///
/// Writes are last-write-wins per symbol, so overlapping refresh cycles can
/// apply their results in any order without corrupting the book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceBook {
    pub quotes: HashMap<String, PriceQuote>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the quote for a symbol (case-insensitive).
    pub fn get(&self, symbol: &str) -> Option<&PriceQuote> {
        self.quotes.get(&symbol.trim().to_uppercase())
    }

    /// Insert or replace a quote.
    ///
    /// `current` must be finite and positive; a `previous_close` that is not
    /// is dropped rather than rejected.
    pub fn update(
        &mut self,
        symbol: &str,
        current: f64,
        previous_close: Option<f64>,
    ) -> Result<(), CoreError> {
        let key = symbol.trim().to_uppercase();
        if key.is_empty() {
            return Err(CoreError::ValidationError("Quote symbol must not be empty".into()));
        }
        if !current.is_finite() || current <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Invalid price for {key}: {current} (must be finite and positive)"
            )));
        }
        let previous_close = previous_close.filter(|p| p.is_finite() && *p > 0.0);
        self.quotes.insert(key, PriceQuote::new(current, previous_close));
        Ok(())
    }

    /// Apply a batch of fetched quotes, later entries winning on conflict.
    /// Returns how many were stored.
    pub fn apply(&mut self, quotes: impl IntoIterator<Item = (String, PriceQuote)>) -> usize {
        let mut stored = 0;
        for (symbol, quote) in quotes {
            if self.update(&symbol, quote.current, quote.previous_close).is_ok() {
                stored += 1;
            }
        }
        stored
    }

    pub fn remove(&mut self, symbol: &str) -> Option<PriceQuote> {
        self.quotes.remove(&symbol.trim().to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn clear(&mut self) {
        self.quotes.clear();
    }
}
