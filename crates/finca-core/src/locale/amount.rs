//! Spanish monetary and percentage parsing.
//!
//! Comma is the decimal separator; dots and spaces group thousands. Parse
//! failures are returned as typed data, never as `Err`: the classifier
//! decides whether an unparsable field becomes a doubt.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

lazy_static! {
    /// Comma-decimal fragment: one or two digits after a comma, not part of a
    /// longer digit run.
    static ref DECIMAL_FRAGMENT: Regex = Regex::new(r",(\d{1,2})(?:\D|$)").unwrap();
}

/// Maximum relative difference tolerated against an externally normalized
/// value before the parse is flagged as drifted.
const DRIFT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2); // 0.05

/// Options controlling a single parse call.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Accept and strip a percent sign; the result is divided by 100.
    pub allow_percent: bool,
    /// Maximum number of decimal digits accepted and kept.
    pub max_decimals: u32,
    /// Original OCR text before any external normalization. Used by the
    /// anti-join guard: a comma-decimal fragment present here must survive
    /// into the input being parsed.
    pub reference_text: Option<String>,
    /// Value produced by an external normalizer (e.g. the OCR provider).
    /// Deviation beyond 5% is flagged as `ValueDrift`, non-fatally.
    pub external_value: Option<Decimal>,
}

impl ParseOptions {
    /// Options for a monetary amount (two decimals).
    pub fn amount() -> Self {
        Self {
            allow_percent: false,
            max_decimals: 2,
            reference_text: None,
            external_value: None,
        }
    }

    /// Options for a percentage (two decimals before scaling).
    pub fn percent() -> Self {
        Self {
            allow_percent: true,
            max_decimals: 2,
            reference_text: None,
            external_value: None,
        }
    }

    /// Supply the original OCR text for the anti-join guard.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_text = Some(reference.into());
        self
    }

    /// Supply an externally normalized value for the drift check.
    pub fn with_external_value(mut self, value: Decimal) -> Self {
        self.external_value = Some(value);
        self
    }
}

/// Why a parse failed (or was flagged).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseIssueKind {
    /// The decimal fragment visible in the reference text disappeared from
    /// the input (e.g. "34,56" collapsed to "3456").
    DecimalLoss,
    /// The input is not a valid Spanish-formatted number.
    InvalidFormat,
    /// The computed value deviates more than 5% from the externally
    /// normalized value. Non-fatal: the computed value is still returned.
    ValueDrift,
}

/// A typed parse issue with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    pub kind: ParseIssueKind,
    pub message: String,
}

/// Result of a single parse call. Immutable; produced per call.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAmount {
    /// The parsed value. Present on success and on non-fatal `ValueDrift`.
    pub value: Option<Decimal>,
    /// The issue, if any.
    pub issue: Option<ParseIssue>,
}

impl ParsedAmount {
    fn ok(value: Decimal) -> Self {
        Self {
            value: Some(value),
            issue: None,
        }
    }

    fn fail(kind: ParseIssueKind, message: impl Into<String>) -> Self {
        Self {
            value: None,
            issue: Some(ParseIssue {
                kind,
                message: message.into(),
            }),
        }
    }

    fn drift(value: Decimal, message: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            issue: Some(ParseIssue {
                kind: ParseIssueKind::ValueDrift,
                message: message.into(),
            }),
        }
    }

    /// True when a value was produced without any issue.
    pub fn is_clean(&self) -> bool {
        self.value.is_some() && self.issue.is_none()
    }
}

/// Parse Spanish-formatted numeric text into an exact decimal.
pub fn parse_spanish_amount(input: &str, opts: &ParseOptions) -> ParsedAmount {
    // Strip currency symbols, percent sign (if allowed) and all whitespace,
    // including non-breaking and thin spaces.
    let mut had_percent = false;
    let mut cleaned = String::with_capacity(input.len());
    for c in input.trim().chars() {
        match c {
            '€' | '$' | '£' => {}
            '%' => {
                if opts.allow_percent {
                    had_percent = true;
                } else {
                    return ParsedAmount::fail(
                        ParseIssueKind::InvalidFormat,
                        "signo de porcentaje no admitido",
                    );
                }
            }
            c if c.is_whitespace() => {}
            c => cleaned.push(c),
        }
    }

    // Leading or wrapping negative sign.
    let mut negative = false;
    if cleaned.len() >= 2 && cleaned.starts_with('(') && cleaned.ends_with(')') {
        negative = true;
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
    }
    if let Some(rest) = cleaned.strip_prefix('-') {
        negative = true;
        cleaned = rest.to_string();
    }

    // Anti-join guard: runs before any interpretation. If the reference text
    // carried a comma-decimal fragment, the same fragment must still be
    // present in the cleaned input.
    if let Some(reference) = &opts.reference_text {
        if let Some(fragment) = decimal_fragment(reference) {
            if decimal_fragment(&cleaned).as_deref() != Some(fragment.as_str()) {
                return ParsedAmount::fail(
                    ParseIssueKind::DecimalLoss,
                    format!("la parte decimal \",{fragment}\" del texto original se ha perdido"),
                );
            }
        }
    }

    if cleaned.matches(',').count() > 1 {
        return ParsedAmount::fail(ParseIssueKind::InvalidFormat, "más de una coma decimal");
    }

    let normalized = if let Some(idx) = cleaned.find(',') {
        // Comma is the decimal separator; dots before it group thousands.
        let integer_part: String = cleaned[..idx].chars().filter(|c| *c != '.').collect();
        let decimal_part = &cleaned[idx + 1..];
        if decimal_part.is_empty()
            || decimal_part.len() as u32 > opts.max_decimals
            || !decimal_part.chars().all(|c| c.is_ascii_digit())
        {
            return ParsedAmount::fail(ParseIssueKind::InvalidFormat, "decimales no válidos");
        }
        if integer_part.is_empty() || !integer_part.chars().all(|c| c.is_ascii_digit()) {
            return ParsedAmount::fail(ParseIssueKind::InvalidFormat, "parte entera no válida");
        }
        format!("{integer_part}.{decimal_part}")
    } else if let Some(idx) = cleaned.rfind('.') {
        let after = &cleaned[idx + 1..];
        if after.len() == 2 && after.chars().all(|c| c.is_ascii_digit()) {
            // Exactly two digits after the last dot: machine-exported
            // Anglo-Saxon decimal (common in bank CSV files).
            let integer_part: String = cleaned[..idx].chars().filter(|c| *c != '.').collect();
            if integer_part.is_empty() || !integer_part.chars().all(|c| c.is_ascii_digit()) {
                return ParsedAmount::fail(ParseIssueKind::InvalidFormat, "parte entera no válida");
            }
            format!("{integer_part}.{after}")
        } else {
            // Dots are thousands separators.
            let digits: String = cleaned.chars().filter(|c| *c != '.').collect();
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return ParsedAmount::fail(ParseIssueKind::InvalidFormat, "número no válido");
            }
            digits
        }
    } else {
        if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
            return ParsedAmount::fail(ParseIssueKind::InvalidFormat, "número no válido");
        }
        cleaned.clone()
    };

    let Ok(mut value) = Decimal::from_str(&normalized) else {
        return ParsedAmount::fail(ParseIssueKind::InvalidFormat, "número no válido");
    };

    if negative {
        value = -value;
    }

    value = value.round_dp_with_strategy(opts.max_decimals, RoundingStrategy::MidpointAwayFromZero);

    if had_percent {
        value /= Decimal::ONE_HUNDRED;
    }

    if let Some(expected) = opts.external_value {
        let denominator = if value.is_zero() {
            if expected.is_zero() {
                Decimal::ONE
            } else {
                expected.abs()
            }
        } else {
            value.abs()
        };
        let relative = (value - expected).abs() / denominator;
        if relative > DRIFT_TOLERANCE {
            return ParsedAmount::drift(
                value,
                format!("el valor normalizado externo {expected} difiere más de un 5% de {value}"),
            );
        }
    }

    ParsedAmount::ok(value)
}

fn decimal_fragment(text: &str) -> Option<String> {
    DECIMAL_FRAGMENT
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// Format an amount in Spanish style (1.234,56). Lossless for any value
/// accepted by [`parse_spanish_amount`] with two decimals.
pub fn format_spanish_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let s = format!("{:.2}", rounded.abs());
    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let chars: Vec<char> = integer_part.chars().collect();
    let mut grouped = String::new();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped},{decimal_part}")
}

/// Format a normalized rate (e.g. 0.21) as a Spanish percentage ("21 %").
pub fn format_spanish_percent(rate: Decimal) -> String {
    let percent = (rate * Decimal::ONE_HUNDRED).normalize();
    format!("{} %", percent.to_string().replace('.', ","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_spanish_amount() {
        let opts = ParseOptions::amount();
        assert_eq!(parse_spanish_amount("1.234,56", &opts).value, Some(dec("1234.56")));
        assert_eq!(parse_spanish_amount("1234,56", &opts).value, Some(dec("1234.56")));
        assert_eq!(
            parse_spanish_amount("12.345.678,90 €", &opts).value,
            Some(dec("12345678.90"))
        );
        assert_eq!(parse_spanish_amount("1 234,56", &opts).value, Some(dec("1234.56")));
        assert_eq!(parse_spanish_amount("500", &opts).value, Some(dec("500")));
    }

    #[test]
    fn test_negative_amounts() {
        let opts = ParseOptions::amount();
        assert_eq!(parse_spanish_amount("-34,56", &opts).value, Some(dec("-34.56")));
        assert_eq!(parse_spanish_amount("(34,56)", &opts).value, Some(dec("-34.56")));
    }

    #[test]
    fn test_dot_heuristic() {
        let opts = ParseOptions::amount();
        // Two digits after the dot: decimal.
        assert_eq!(parse_spanish_amount("34.56", &opts).value, Some(dec("34.56")));
        // Three digits after the dot: thousands.
        assert_eq!(parse_spanish_amount("3.455", &opts).value, Some(dec("3455")));
    }

    #[test]
    fn test_anti_join_guard() {
        let opts = ParseOptions::amount().with_reference("34,56 €");
        let result = parse_spanish_amount("3455", &opts);
        assert_eq!(result.value, None);
        assert_eq!(result.issue.unwrap().kind, ParseIssueKind::DecimalLoss);

        // Fragment survived: no loss.
        let opts = ParseOptions::amount().with_reference("34,56 €");
        assert_eq!(parse_spanish_amount("34,56", &opts).value, Some(dec("34.56")));
    }

    #[test]
    fn test_anglo_saxon_rejected() {
        let opts = ParseOptions::amount();
        let result = parse_spanish_amount("95,678.21", &opts);
        assert_eq!(result.value, None);
        assert_eq!(result.issue.unwrap().kind, ParseIssueKind::InvalidFormat);
    }

    #[test]
    fn test_multiple_commas_rejected() {
        let opts = ParseOptions::amount();
        let result = parse_spanish_amount("1,234,56", &opts);
        assert_eq!(result.issue.unwrap().kind, ParseIssueKind::InvalidFormat);
    }

    #[test]
    fn test_value_drift() {
        let opts = ParseOptions::amount().with_external_value(dec("100.00"));
        let result = parse_spanish_amount("120,00", &opts);
        // Non-fatal: the computed value is still returned.
        assert_eq!(result.value, Some(dec("120.00")));
        assert_eq!(result.issue.unwrap().kind, ParseIssueKind::ValueDrift);

        let opts = ParseOptions::amount().with_external_value(dec("119.00"));
        let result = parse_spanish_amount("120,00", &opts);
        assert!(result.is_clean());
    }

    #[test]
    fn test_percent() {
        let opts = ParseOptions::percent();
        assert_eq!(parse_spanish_amount("21 %", &opts).value, Some(dec("0.21")));
        assert_eq!(parse_spanish_amount("3,5 %", &opts).value, Some(dec("0.035")));

        // Percent sign rejected when not allowed.
        let opts = ParseOptions::amount();
        let result = parse_spanish_amount("21 %", &opts);
        assert_eq!(result.issue.unwrap().kind, ParseIssueKind::InvalidFormat);
    }

    #[test]
    fn test_format_spanish_amount() {
        assert_eq!(format_spanish_amount(dec("1234.56")), "1.234,56");
        assert_eq!(format_spanish_amount(dec("12345678.90")), "12.345.678,90");
        assert_eq!(format_spanish_amount(dec("-1234.5")), "-1.234,50");
        assert_eq!(format_spanish_amount(dec("0.5")), "0,50");
    }

    #[test]
    fn test_format_spanish_percent() {
        assert_eq!(format_spanish_percent(dec("0.21")), "21 %");
        assert_eq!(format_spanish_percent(dec("0.035")), "3,5 %");
    }

    #[test]
    fn test_round_trip() {
        let opts = ParseOptions::amount();
        for s in ["0.01", "1.50", "1234.56", "12345678.90", "-987.65", "42.00"] {
            let v = dec(s);
            let parsed = parse_spanish_amount(&format_spanish_amount(v), &opts);
            assert_eq!(parsed.value, Some(v), "round trip failed for {s}");
        }
    }

    #[test]
    fn test_percent_round_trip() {
        let opts = ParseOptions::percent();
        for s in ["0.21", "0.035", "0.1"] {
            let v = dec(s);
            let parsed = parse_spanish_amount(&format_spanish_percent(v), &opts);
            assert_eq!(parsed.value, Some(v), "percent round trip failed for {s}");
        }
    }

    #[test]
    fn test_rounding_to_max_decimals() {
        let opts = ParseOptions {
            max_decimals: 1,
            ..ParseOptions::amount()
        };
        assert_eq!(parse_spanish_amount("34,5", &opts).value, Some(dec("34.5")));
        // Two decimals when only one is allowed.
        let result = parse_spanish_amount("34,56", &opts);
        assert_eq!(result.issue.unwrap().kind, ParseIssueKind::InvalidFormat);
    }
}
