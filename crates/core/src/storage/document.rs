use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CoreError;
use crate::models::transaction::Transaction;

/// Stored form: `{ "transactions": [...] }`.
#[derive(Serialize)]
struct LedgerDocument<'a> {
    transactions: &'a [Transaction],
}

/// Decode a ledger document (or a legacy bare array) from JSON bytes.
///
/// Records are decoded one by one so a failure names the record it came from.
pub fn decode(bytes: &[u8]) -> Result<Vec<Transaction>, CoreError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| CoreError::Deserialization(format!("Invalid ledger document: {e}")))?;

    let records = match value {
        Value::Object(mut map) => match map.remove("transactions") {
            Some(Value::Array(records)) => records,
            _ => {
                return Err(CoreError::Deserialization(
                    "Invalid ledger document: expected a \"transactions\" array".into(),
                ))
            }
        },
        Value::Array(records) => {
            debug!("Read legacy array-form ledger with {} transactions", records.len());
            records
        }
        _ => {
            return Err(CoreError::Deserialization(
                "Invalid ledger document: expected an object or an array".into(),
            ))
        }
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            Transaction::deserialize(record).map_err(|e| {
                CoreError::Deserialization(format!(
                    "Invalid ledger document: transaction at index {index}: {e}"
                ))
            })
        })
        .collect()
}

/// Encode the log in document form, pretty-printed.
pub fn encode(transactions: &[Transaction]) -> Result<Vec<u8>, CoreError> {
    serde_json::to_vec_pretty(&LedgerDocument { transactions })
        .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger: {e}")))
}
