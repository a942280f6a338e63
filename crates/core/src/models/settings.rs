use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::CoreError;

/// What the ledger does when a sell exceeds the shares held for its
/// (symbol, broker).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OversellPolicy {
    /// Fail the replay with `CoreError::Oversell`
    #[default]
    Reject,
    /// Consume every available lot and report the excess as an `UnmatchedSell`
    Clamp,
}

/// User-configurable settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Optional API keys for quote providers that require them.
    /// Keys: provider name (e.g., "finnhub"). Values: the API key string.
    #[serde(default)]
    pub api_keys: HashMap<String, String>,

    #[serde(default)]
    pub oversell_policy: OversellPolicy,
}

impl Settings {
    /// Parse a JSON settings document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::Deserialization(format!("Invalid settings document: {e}")))
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize settings: {e}")))
    }
}
