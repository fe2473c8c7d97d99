//! Parsing helpers shared by the cleaning rules.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::snapshot::Scalar;

const LOWEST_DATE_CODE: i64 = 19_000_101;
const HIGHEST_DATE_CODE: i64 = 20_500_101;

/// Parse a decimal literal, returning `None` for blank or non-numeric text.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Parse a calendar date from the formats the source extracts use.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y/%m/%d"))
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date())
        })
        .ok()
}

/// Decode a `YYYYMMDD` integer into a date.
///
/// Only positive, exactly eight-digit codes within `[19000101, 20500101]` that
/// name a real calendar day decode; everything else is `None`.
pub fn decode_date_code(code: i64) -> Option<NaiveDate> {
    if code <= 0 || code.to_string().len() != 8 {
        return None;
    }
    if !(LOWEST_DATE_CODE..=HIGHEST_DATE_CODE).contains(&code) {
        return None;
    }
    let year = (code / 10_000) as i32;
    let month = ((code / 100) % 100) as u32;
    let day = (code % 100) as u32;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Integer reading of a date-code cell. Anything that is not an integer yields `None`.
pub fn date_code(value: &Scalar) -> Option<i64> {
    match value {
        Scalar::Integer(v) => Some(*v),
        Scalar::Decimal(d) if d.fract().is_zero() => i64::try_from(*d).ok(),
        Scalar::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Trim surrounding whitespace, keeping nulls as nulls.
pub fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string())
}
