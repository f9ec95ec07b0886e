//! Dollar-amount extraction.
//!
//! Only `$`-prefixed figures are recognized: `$1,250`, `$25.5K`, `$3M`,
//! `$1.2b`. Amounts written out in prose or in other currencies are ignored.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d[\d,]*(?:\.\d+)?)([KkMmBb])?").unwrap());

/// Multiplier for a magnitude suffix.
fn suffix_factor(suffix: char) -> f64 {
    match suffix.to_ascii_uppercase() {
        'K' => 1e3,
        'M' => 1e6,
        'B' => 1e9,
        _ => 1.0,
    }
}

/// Extract dollar amounts in order of appearance, duplicates retained.
///
/// Malformed tokens are skipped.
pub fn extract_financial_values(text: &str) -> Vec<f64> {
    let mut values = Vec::new();

    for caps in AMOUNT.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let digits = caps.get(1).map(|m| m.as_str()).unwrap_or_default();

        // A suffix glued to a word ("$5Million") is not a magnitude.
        let suffix = caps
            .get(2)
            .and_then(|m| m.as_str().chars().next())
            .filter(|_| {
                !text[whole.end()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_alphabetic())
            });

        let normalized = digits.replace(',', "");
        match normalized.parse::<f64>() {
            Ok(amount) if amount.is_finite() => {
                values.push(amount * suffix.map(suffix_factor).unwrap_or(1.0));
            }
            Ok(_) | Err(_) => {
                debug!(token = whole.as_str(), "Skipping malformed financial token");
            }
        }
    }

    values
}

/// Format a dollar amount with thousands separators: `$1,234,567` or
/// `$19.99`. Cents are shown only when present.
pub fn format_currency(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents_total = (amount.abs() * 100.0).round() as u128;
    let whole = cents_total / 100;
    let cents = cents_total % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    if cents == 0 {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped}.{cents:02}")
    }
}
