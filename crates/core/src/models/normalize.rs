//! Boundary normalization for transaction records coming from external stores.
//!
//! Stores disagree on shapes: the JSON backend writes `YYYY-MM-DD`, broker
//! exports write `2025/1/24 am 2:21:23`, spreadsheet rows arrive as RFC 3339
//! timestamps with blank cells serialized as `""` and numeric-looking cells
//! (Taiwan tickers such as `2330`) stored as numbers. Everything is folded
//! into a `NaiveDate`, plain `f64`, `String` and `Option<Currency>` here,
//! before the ledger ever sees it.

use chrono::{DateTime, NaiveDate};
use log::warn;
use serde::de::{self, Deserializer, Visitor};
use std::fmt;

use crate::errors::CoreError;
use crate::models::transaction::Currency;

/// Parse a trade date in any of the accepted textual forms.
///
/// Accepted:
/// - `YYYY-MM-DD`, `YYYY/M/D`, `YYYY.M.D` (month/day may be unpadded)
/// - any of the above followed by whitespace and a time part
/// - RFC 3339 timestamps; the date is taken in the timestamp's own offset
pub fn parse_trade_date(raw: &str) -> Result<NaiveDate, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidDate("empty date".into()));
    }

    if trimmed.contains('T') {
        if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(ts.date_naive());
        }
    }

    let date_part = trimmed.split_whitespace().next().unwrap_or(trimmed);
    let mut parts = date_part.split(|c: char| c == '-' || c == '/' || c == '.');
    let (Some(y), Some(m), Some(d), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CoreError::InvalidDate(format!("unrecognized date format '{raw}'")));
    };

    let year: i32 = y
        .parse()
        .map_err(|_| CoreError::InvalidDate(format!("invalid year in '{raw}'")))?;
    let month: u32 = m
        .parse()
        .map_err(|_| CoreError::InvalidDate(format!("invalid month in '{raw}'")))?;
    let day: u32 = d
        .parse()
        .map_err(|_| CoreError::InvalidDate(format!("invalid day in '{raw}'")))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| CoreError::InvalidDate(format!("'{raw}' is not a calendar date")))
}

/// Serde adapter: writes `YYYY-MM-DD`, reads any form `parse_trade_date` accepts.
pub mod trade_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_trade_date(&raw).map_err(serde::de::Error::custom)
    }
}

/// Coerce a numeric field leniently: numbers and numeric strings pass through,
/// blanks, `null` and unparseable text become `0.0`.
///
/// This is the documented weak guarantee for malformed records. Callers that
/// need strict validation run `TransactionService::validate` afterwards.
pub fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    deserializer.deserialize_any(LenientF64)
}

struct LenientF64;

impl<'de> Visitor<'de> for LenientF64 {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number, a numeric string, or a blank")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
        let cleaned = v.trim().replace(',', "");
        if cleaned.is_empty() {
            return Ok(0.0);
        }
        match cleaned.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(n),
            _ => {
                warn!("Coercing non-numeric field value '{v}' to 0");
                Ok(0.0)
            }
        }
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<f64, E> {
        warn!("Coercing boolean field value '{v}' to 0");
        Ok(0.0)
    }

    fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
        Ok(0.0)
    }

    fn visit_none<E: de::Error>(self) -> Result<f64, E> {
        Ok(0.0)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(LenientF64)
    }
}

/// Read a text field that a spreadsheet may have stored as a number.
/// Integral numbers keep no fractional part (`2330`, not `2330.0`).
pub fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    deserializer.deserialize_any(LenientString)
}

struct LenientString;

impl<'de> Visitor<'de> for LenientString {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string or a number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
        if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
            Ok(format!("{}", v as i64))
        } else {
            Ok(v.to_string())
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<String, E> {
        Ok(String::new())
    }

    fn visit_none<E: de::Error>(self) -> Result<String, E> {
        Ok(String::new())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<String, D::Error> {
        deserializer.deserialize_any(LenientString)
    }
}

/// Read an optional currency: blanks and `null` mean "not recorded", names
/// match case-insensitively, and an unknown code is dropped with a warning so
/// the broker's settlement currency applies.
pub fn lenient_currency<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Currency>, D::Error> {
    let raw = lenient_string(deserializer)?;
    let code = raw.trim().to_uppercase();
    Ok(match code.as_str() {
        "" => None,
        "TWD" => Some(Currency::TWD),
        "USD" => Some(Currency::USD),
        _ => {
            warn!("Ignoring unknown currency '{raw}'");
            None
        }
    })
}

/// Clamp a value read by the engine to a usable magnitude:
/// non-finite or negative inputs become `0.0`.
pub(crate) fn sanitize_amount(value: f64, field: &str, transaction_id: &str) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!("Transaction {transaction_id}: invalid {field} ({value}) treated as 0");
        0.0
    }
}
