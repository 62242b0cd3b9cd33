//! Type conversion functions for format correction.

use super::sanitizers::{normalize_date_text, strip_quotes};
use crate::utils::{date_series, is_datetime_dtype, is_numeric_dtype};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

/// Calendar date representations with a four-digit year, tried in order.
pub(crate) const DATE_FORMATS: [&str; 15] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
];

/// Two-digit year representations, tried after every four-digit format.
const SHORT_YEAR_FORMATS: [&str; 5] = [
    "%m/%d/%y",
    "%m-%d-%y",
    "%d.%m.%y",
    "%d-%b-%y",
    "%d %b %y",
];

/// chrono's `%Y` also accepts one to three digits; such years are rejected.
const MIN_FOUR_DIGIT_YEAR: i32 = 1000;

/// Date-time representations; the time of day is discarded.
const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// The canonical date format.
pub(crate) const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-/](\d{1,2})$").expect("Invalid regex: YYYY-MM"));

/// Best-effort recognition of a calendar date.
pub(crate) fn parse_date(raw: &str, quote_chars: &[char]) -> Option<NaiveDate> {
    let text = normalize_date_text(raw, quote_chars);
    if text.is_empty() {
        return None;
    }

    let four_digit = |date: &NaiveDate| date.year() >= MIN_FOUR_DIGIT_YEAR;

    let parsed = DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(&text, format).ok())
        .chain(
            DATETIME_FORMATS
                .iter()
                .filter_map(|format| NaiveDateTime::parse_from_str(&text, format).ok())
                .map(|datetime| datetime.date()),
        )
        .find(four_digit);
    if parsed.is_some() {
        return parsed;
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(&text) {
        return Some(datetime.date_naive());
    }

    if let Some(caps) = YEAR_MONTH.captures(&text) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }

    SHORT_YEAR_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&text, format).ok())
}

/// Whether `raw` is already a date in the canonical `YYYY-MM-DD` format.
pub(crate) fn is_canonical_date(raw: &str) -> bool {
    NaiveDate::parse_from_str(raw.trim(), CANONICAL_DATE_FORMAT).is_ok()
}

/// Convert a timestamp column to a polars `Date` series.
///
/// Typed columns are cast; text is parsed row by row. The first missing or
/// unrecognized row aborts the conversion.
pub(crate) fn to_date_series(series: &Series, quote_chars: &[char]) -> Result<Series> {
    let converted = if is_datetime_dtype(series.dtype()) {
        series.cast(&DataType::Date)?
    } else {
        let text = series.cast(&DataType::String)?;
        let mut dates = Vec::with_capacity(text.len());

        for (row, opt_val) in text.str()?.into_iter().enumerate() {
            let val = opt_val.ok_or_else(|| anyhow!("row {}: missing timestamp", row))?;
            let date = parse_date(val, quote_chars)
                .ok_or_else(|| anyhow!("row {}: unrecognized date '{}'", row, val))?;
            dates.push(Some(date));
        }

        date_series(series.name().as_str(), &dates)?
    };

    let nulls = converted.is_null();
    if let Some(row) = nulls.into_iter().position(|v| v == Some(true)) {
        return Err(anyhow!("row {}: missing timestamp", row));
    }

    Ok(converted)
}

/// A coerced value column together with the reasons entries went missing.
#[derive(Debug)]
pub(crate) struct ValueCoercion {
    pub series: Series,
    pub coerced_to_missing: usize,
    pub null_tokens: usize,
    pub already_missing: usize,
}

/// Convert a value column to `Float64`.
///
/// Text is cleaned with [`strip_quotes`]; `null_token` and unparsable or
/// non-finite entries become missing.
pub(crate) fn to_float_series(
    series: &Series,
    null_token: &str,
    quote_chars: &[char],
) -> Result<ValueCoercion> {
    let already_missing = series.null_count();

    if is_numeric_dtype(series.dtype()) {
        let floats = series.cast(&DataType::Float64)?;
        let mut coerced_to_missing = 0;
        let values: Vec<Option<f64>> = floats
            .f64()?
            .into_iter()
            .map(|v| match v {
                Some(x) if !x.is_finite() => {
                    coerced_to_missing += 1;
                    None
                }
                other => other,
            })
            .collect();

        return Ok(ValueCoercion {
            series: Series::new(series.name().clone(), values),
            coerced_to_missing,
            null_tokens: 0,
            already_missing,
        });
    }

    let text = series.cast(&DataType::String)?;
    let mut coerced_to_missing = 0;
    let mut null_tokens = 0;
    let mut values: Vec<Option<f64>> = Vec::with_capacity(text.len());

    for opt_val in text.str()?.into_iter() {
        let Some(val) = opt_val else {
            values.push(None);
            continue;
        };

        let cleaned = strip_quotes(val, quote_chars);
        if cleaned == null_token {
            null_tokens += 1;
            values.push(None);
            continue;
        }

        match cleaned.parse::<f64>() {
            Ok(x) if x.is_finite() => values.push(Some(x)),
            _ => {
                coerced_to_missing += 1;
                values.push(None);
            }
        }
    }

    Ok(ValueCoercion {
        series: Series::new(series.name().clone(), values),
        coerced_to_missing,
        null_tokens,
        already_missing,
    })
}

/// Whether `raw` parses as a finite number after trimming whitespace.
pub(crate) fn is_number(raw: &str) -> bool {
    raw.trim().parse::<f64>().is_ok_and(f64::is_finite)
}
