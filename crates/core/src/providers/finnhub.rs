use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::price::PriceQuote;
use super::traits::QuoteProvider;

const BASE_URL: &str = "https://finnhub.io/api/v1/quote";

/// Finnhub quote provider.
///
/// - **Requires**: API key (set via settings as "finnhub").
/// - **Coverage**: US equities; Taiwan listings as `NNNN.TW`.
/// - Unknown tickers come back as HTTP 200 with every field zeroed.
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
}

impl FinnhubProvider {
    pub fn new(api_key: String) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }
}

// ── Finnhub API response types ──────────────────────────────────────

#[derive(Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// Previous close
    pc: Option<f64>,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl QuoteProvider for FinnhubProvider {
    fn name(&self) -> &str {
        "Finnhub"
    }

    async fn get_quote(&self, ticker: &str) -> Result<PriceQuote, CoreError> {
        let resp: QuoteResponse = self
            .client
            .get(BASE_URL)
            .query(&[("symbol", ticker), ("token", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Finnhub".into(),
                message: format!("Failed to parse quote for {ticker}: {e}"),
            })?;

        match resp.c {
            Some(current) if current > 0.0 => Ok(PriceQuote::new(
                current,
                resp.pc.filter(|p| *p > 0.0),
            )),
            _ => Err(CoreError::PriceNotAvailable {
                symbol: ticker.to_string(),
            }),
        }
    }
}
