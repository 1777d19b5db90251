//! Locale-tolerant numeric token parsing.
//!
//! Source pages mix "2.30" and "2,30", pad values with labels and glyphs,
//! and routinely omit numbers altogether. A missing numeric token is a
//! legitimate outcome for every caller, so these helpers return `None`
//! instead of an error.

use once_cell::sync::Lazy;
use regex::Regex;

static DECIMAL_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+(?:[.,]\d+)?").expect("valid regex"));

static PERCENT_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,3})\s*%").expect("valid regex"));

/// First decimal token in `text`, accepting both "." and "," as the
/// fractional separator. Leading/trailing noise is ignored.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let token = DECIMAL_RX.find(text)?;
    token.as_str().replace(',', ".").parse::<f64>().ok()
}

/// First integer immediately preceding a "%" glyph, clamped to 0..=100.
pub fn parse_percent_int(text: &str) -> Option<u8> {
    for caps in PERCENT_RX.captures_iter(text) {
        if let Ok(value) = caps[1].parse::<u8>() {
            if value <= 100 {
                return Some(value);
            }
        }
    }
    None
}

/// All decimal tokens in `text`, in order.
pub fn decimals(text: &str) -> Vec<f64> {
    DECIMAL_RX
        .find_iter(text)
        .filter_map(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
        .collect()
}

/// All percent tokens in `text`, in order.
pub fn percents(text: &str) -> Vec<u8> {
    PERCENT_RX
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<u8>().ok())
        .filter(|v| *v <= 100)
        .collect()
}
