use std::collections::HashMap;

use super::finnhub::FinnhubProvider;
#[cfg(not(target_arch = "wasm32"))]
use super::yahoo_finance::YahooFinanceProvider;
use super::traits::QuoteProvider;

/// Ordered list of quote providers. The price service asks them in
/// registration order and stops at the first success.
pub struct QuoteProviderRegistry {
    providers: Vec<Box<dyn QuoteProvider>>,
}

impl QuoteProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with all default providers pre-configured.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();

        // Finnhub: requires an API key, primary when configured
        if let Some(key) = api_keys.get("finnhub").filter(|k| !k.trim().is_empty()) {
            registry.register(Box::new(FinnhubProvider::new(key.clone())));
        }

        // Yahoo Finance: no API key, fallback
        #[cfg(not(target_arch = "wasm32"))]
        {
            if let Ok(yahoo) = YahooFinanceProvider::new() {
                registry.register(Box::new(yahoo));
            }
        }

        registry
    }

    /// Register a new quote provider at the lowest priority.
    pub fn register(&mut self, provider: Box<dyn QuoteProvider>) {
        self.providers.push(provider);
    }

    /// All providers, ordered by registration priority.
    pub fn providers(&self) -> Vec<&dyn QuoteProvider> {
        self.providers.iter().map(|p| p.as_ref()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for QuoteProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
