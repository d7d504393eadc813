//! Amount formatting and tolerant amount parsing.
//!
//! Amounts are whole-currency figures in practice (yen), but stored as
//! `Decimal` so that sums never drift. Display always rounds to zero
//! fractional digits.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Locale
// ---------------------------------------------------------------------------

/// Number-formatting conventions for the user's currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountLocale {
    pub currency_symbol: String,
    pub currency_code: String,
    pub grouping_separator: char,
    pub decimal_separator: char,
    /// `1.000 €` instead of `¥1,000`.
    #[serde(default)]
    pub symbol_after: bool,
}

impl Default for AmountLocale {
    fn default() -> Self {
        Self::ja_jp()
    }
}

impl AmountLocale {
    pub fn ja_jp() -> Self {
        Self {
            currency_symbol: "¥".into(),
            currency_code: "JPY".into(),
            grouping_separator: ',',
            decimal_separator: '.',
            symbol_after: false,
        }
    }

    pub fn en_us() -> Self {
        Self {
            currency_symbol: "$".into(),
            currency_code: "USD".into(),
            grouping_separator: ',',
            decimal_separator: '.',
            symbol_after: false,
        }
    }

    pub fn de_de() -> Self {
        Self {
            currency_symbol: "€".into(),
            currency_code: "EUR".into(),
            grouping_separator: '.',
            decimal_separator: ',',
            symbol_after: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn round_whole(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Insert `sep` every three digits from the right.
fn group_digits(digits: &str, sep: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

/// Currency string with zero fractional digits, e.g. `¥12,345` or `-¥800`.
pub fn format_currency(amount: Decimal, locale: &AmountLocale) -> String {
    let rounded = round_whole(amount);
    let negative = rounded < Decimal::ZERO;
    let digits = rounded.abs().trunc().normalize().to_string();
    let grouped = group_digits(&digits, locale.grouping_separator);
    let sign = if negative { "-" } else { "" };

    if locale.symbol_after {
        format!("{sign}{grouped} {}", locale.currency_symbol)
    } else {
        format!("{sign}{}{grouped}", locale.currency_symbol)
    }
}

/// Net-profit style: always carries a sign, `+¥0` for break-even.
pub fn format_signed_currency(amount: Decimal, locale: &AmountLocale) -> String {
    let formatted = format_currency(amount.abs(), locale);
    if round_whole(amount) < Decimal::ZERO {
        format!("-{formatted}")
    } else {
        format!("+{formatted}")
    }
}

/// Whole amount without grouping, as loaded back into an edit field.
pub fn format_plain(amount: Decimal) -> String {
    round_whole(amount).normalize().to_string()
}

/// `85%`; `— %` when there is nothing to divide by.
pub fn format_return_rate(rate: Option<Decimal>) -> String {
    match rate {
        Some(r) => format!("{}%", round_whole(r).normalize()),
        None => "— %".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse free-form amount input.
///
/// First a strict grouped parse in the locale's conventions (`1,234`,
/// `1,234.5`), then a fallback that strips grouping separators and spaces
/// and reads a plain decimal. `None` when neither works.
pub fn parse_amount(text: &str, locale: &AmountLocale) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    parse_grouped(trimmed, locale).or_else(|| {
        let sanitized: String = trimmed
            .chars()
            .filter(|c| *c != locale.grouping_separator && *c != ' ')
            .collect();
        Decimal::from_str(&sanitized).ok()
    })
}

/// Locale-grouped decimal: grouping separators only at thousands
/// boundaries, at most one decimal separator.
fn parse_grouped(text: &str, locale: &AmountLocale) -> Option<Decimal> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let mut parts = body.split(locale.decimal_separator);
    let integer = parts.next()?;
    let fraction = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let mut canonical = String::with_capacity(body.len() + 1);
    if negative {
        canonical.push('-');
    }

    let groups: Vec<&str> = integer.split(locale.grouping_separator).collect();
    let (first, rest) = groups.split_first()?;
    if first.is_empty() || !first.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !rest.is_empty() && first.len() > 3 {
        return None;
    }
    canonical.push_str(first);
    for group in rest {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        canonical.push_str(group);
    }

    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        canonical.push('.');
        canonical.push_str(fraction);
    }

    Decimal::from_str(&canonical).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_currency_ja() {
        let ja = AmountLocale::ja_jp();
        assert_eq!(format_currency(dec!(0), &ja), "¥0");
        assert_eq!(format_currency(dec!(100), &ja), "¥100");
        assert_eq!(format_currency(dec!(1000), &ja), "¥1,000");
        assert_eq!(format_currency(dec!(1234567), &ja), "¥1,234,567");
        assert_eq!(format_currency(dec!(-800), &ja), "-¥800");
    }

    #[test]
    fn test_format_currency_rounds_half_away_from_zero() {
        let ja = AmountLocale::ja_jp();
        assert_eq!(format_currency(dec!(999.5), &ja), "¥1,000");
        assert_eq!(format_currency(dec!(999.49), &ja), "¥999");
        assert_eq!(format_currency(dec!(-0.4), &ja), "¥0");
    }

    #[test]
    fn test_format_currency_symbol_after() {
        let de = AmountLocale::de_de();
        assert_eq!(format_currency(dec!(1234), &de), "1.234 €");
        assert_eq!(format_currency(dec!(-50), &de), "-50 €");
    }

    #[test]
    fn test_format_signed_currency() {
        let ja = AmountLocale::ja_jp();
        assert_eq!(format_signed_currency(dec!(1500), &ja), "+¥1,500");
        assert_eq!(format_signed_currency(dec!(-2000), &ja), "-¥2,000");
        assert_eq!(format_signed_currency(dec!(0), &ja), "+¥0");
    }

    #[test]
    fn test_format_plain() {
        assert_eq!(format_plain(dec!(1000.00)), "1000");
        assert_eq!(format_plain(dec!(12345)), "12345");
    }

    #[test]
    fn test_format_return_rate() {
        assert_eq!(format_return_rate(Some(dec!(84.6))), "85%");
        assert_eq!(format_return_rate(Some(dec!(250))), "250%");
        assert_eq!(format_return_rate(None), "— %");
    }

    #[test]
    fn test_parse_grouped_and_plain() {
        let ja = AmountLocale::ja_jp();
        assert_eq!(parse_amount("1,000", &ja), Some(dec!(1000)));
        assert_eq!(parse_amount("1000", &ja), Some(dec!(1000)));
        assert_eq!(parse_amount(" 12,345.5 ", &ja), Some(dec!(12345.5)));
        assert_eq!(parse_amount("-300", &ja), Some(dec!(-300)));
    }

    #[test]
    fn test_parse_fallback_strips_grouping_and_spaces() {
        let ja = AmountLocale::ja_jp();
        // Misplaced grouping fails the strict parse but survives the fallback.
        assert_eq!(parse_amount("10,00", &ja), Some(dec!(1000)));
        assert_eq!(parse_amount("1 000", &ja), Some(dec!(1000)));
        assert_eq!(parse_amount("1,0,0,0", &ja), Some(dec!(1000)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let ja = AmountLocale::ja_jp();
        assert_eq!(parse_amount("", &ja), None);
        assert_eq!(parse_amount("   ", &ja), None);
        assert_eq!(parse_amount("abc", &ja), None);
        assert_eq!(parse_amount("¥1,000", &ja), None);
        assert_eq!(parse_amount("1.2.3", &ja), None);
    }

    #[test]
    fn test_parse_german_conventions() {
        let de = AmountLocale::de_de();
        assert_eq!(parse_amount("1.234,5", &de), Some(dec!(1234.5)));
        assert_eq!(parse_amount("1234", &de), Some(dec!(1234)));
        // Fallback strips '.', leaving a ',' the plain parser rejects.
        assert_eq!(parse_amount("12.34,5.6", &de), None);
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits("1", ','), "1");
        assert_eq!(group_digits("123", ','), "123");
        assert_eq!(group_digits("1234", ','), "1,234");
        assert_eq!(group_digits("123456", ','), "123,456");
    }
}
