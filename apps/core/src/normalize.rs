use chrono::{DateTime, NaiveDate, NaiveDateTime};
use unicode_normalization::UnicodeNormalization;

use crate::model::RawRecord;

/// Column aliases accepted for the product name, in priority order.
pub const NAME_ALIASES: [&str; 4] = ["name", "Nombre", "producto", "Producto"];

/// Comparison-key function shared by indexing and querying.
#[derive(Clone, Copy)]
pub struct Normalizer(fn(&str) -> String);

impl Normalizer {
    pub const fn new(apply: fn(&str) -> String) -> Self {
        Self(apply)
    }

    pub fn apply(&self, input: &str) -> String {
        (self.0)(input)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self(normalize_text)
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Normalizer")
    }
}

/// Lowercases, strips combining diacritics and collapses everything that is not
/// an ASCII word character or hyphen into single spaces.
pub fn normalize_text(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;

    for ch in lowered.nfd() {
        if ('\u{0300}'..='\u{036f}').contains(&ch) {
            continue;
        }

        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }

    out
}

pub fn pick_name(record: &RawRecord) -> String {
    NAME_ALIASES
        .iter()
        .find_map(|alias| record.get(alias))
        .unwrap_or_default()
        .to_string()
}

/// Parses a price written with `.` as thousands separator and `,` as decimal mark.
/// Anything unparseable is 0.
pub fn parse_price(input: &str) -> f64 {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '-'))
        .collect();
    let cleaned = cleaned.replacen(',', ".", 1);

    match leading_float(&cleaned) {
        Some(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

fn leading_float(input: &str) -> Option<f64> {
    let bytes = input.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            has_digits = true;
            end = frac_end;
        } else if has_digits {
            end = frac_end;
        }
    }

    if !has_digits {
        return None;
    }
    input[..end].parse::<f64>().ok()
}

/// Renders an amount the way es-AR formats ARS, e.g. `$ 1.234,50`.
pub fn format_currency(amount: f64) -> String {
    let amount = if amount.is_finite() { amount } else { 0.0 };
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (position, digit) in whole.chars().enumerate() {
        if position > 0 && (whole.len() - position) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}$\u{a0}{grouped},{fraction:02}")
}

/// Epoch milliseconds for an ISO-ish date or date-time. Values without an offset are UTC.
pub fn parse_timestamp(input: &str) -> Option<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.timestamp_millis());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(parsed.timestamp_millis());
    }

    const DATE_TIME_FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed.and_utc().timestamp_millis());
        }
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, format) {
            return parsed
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc().timestamp_millis());
        }
    }

    None
}
