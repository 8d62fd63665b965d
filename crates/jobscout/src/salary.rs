//! Free-text pay parser.
//!
//! Turns strings such as `"$90,000 - $100,000 a year"`, `"$45/hour"` or
//! `"$120K/yr - $150K/yr"` into one comparable yearly figure.
//!
//! Pattern families are tried in a fixed order: yearly, hourly, monthly.
//! Inside each family the two-number range pattern is tried before the
//! single-number pattern, and the first pattern that matches anywhere in the
//! text wins. A range resolves to the arithmetic mean of its two ends.
//! A range quoted with no period at all is read as yearly, but only after
//! every marked pattern has failed.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Working hours in a year: 40-hour weeks, 52 weeks.
pub const HOURS_PER_YEAR: f64 = 40.0 * 52.0;
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// A dollar amount, optionally with thousands separators and cents.
const NUMBER: &str = r"(\d{1,3}(?:,?\d{3})*(?:\.\d{1,2})?)";
const DASH: &str = r"\s*[-–]\s*";

/// The pay period a salary text was quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayPeriod {
    Yearly,
    Hourly,
    Monthly,
}

impl PayPeriod {
    /// Multiplier that converts one unit of this period to a yearly figure.
    pub fn yearly_factor(&self) -> f64 {
        match self {
            PayPeriod::Yearly => 1.0,
            PayPeriod::Hourly => HOURS_PER_YEAR,
            PayPeriod::Monthly => MONTHS_PER_YEAR,
        }
    }
}

/// A parsed pay figure.
#[derive(Debug, Clone, PartialEq)]
pub struct SalaryEstimate {
    pub period: PayPeriod,
    /// Amounts as quoted, after "K" expansion, before period conversion.
    pub amounts: Vec<f64>,
    /// Yearly equivalent of the mean of `amounts`.
    pub yearly: f64,
}

struct PatternFamily {
    period: PayPeriod,
    range: Regex,
    single: Regex,
}

fn families() -> &'static [PatternFamily] {
    static FAMILIES: OnceLock<Vec<PatternFamily>> = OnceLock::new();
    FAMILIES.get_or_init(|| {
        vec![
            family(
                PayPeriod::Yearly,
                "/yr",
                "a year|annual|annually|/year|per year|/yr|yr",
            ),
            family(
                PayPeriod::Hourly,
                "/hr",
                "an hour|/hour|per hour|hourly|/hr|hr",
            ),
            family(
                PayPeriod::Monthly,
                "/mo",
                "a month|monthly|/month|per month",
            ),
        ]
    })
}

fn unmarked_range() -> &'static Regex {
    static UNMARKED: OnceLock<Regex> = OnceLock::new();
    UNMARKED.get_or_init(|| {
        Regex::new(&format!(r"(?i)\${NUMBER}K?{DASH}\$?{NUMBER}K?"))
            .expect("unmarked salary range regex is valid")
    })
}

fn family(period: PayPeriod, unit: &str, markers: &str) -> PatternFamily {
    let range = format!(
        r"(?i)\${NUMBER}K?(?:{unit})?{DASH}\$?{NUMBER}K?(?:{unit})?\s*(?:{markers})"
    );
    let single = format!(r"(?i)\${NUMBER}K?\s*(?:{markers})");
    PatternFamily {
        period,
        range: Regex::new(&range).expect("salary range regex is valid"),
        single: Regex::new(&single).expect("salary single regex is valid"),
    }
}

/// Parse free text into a yearly salary. Returns `None` for empty text or
/// text that carries no recognizable pay figure.
pub fn normalize_yearly(text: &str) -> Option<f64> {
    parse_salary(text).map(|estimate| estimate.yearly)
}

/// Parse free text into a [`SalaryEstimate`], keeping the matched period and
/// the quoted amounts.
pub fn parse_salary(text: &str) -> Option<SalaryEstimate> {
    let text = text.replace('\n', " ");
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for family in families() {
        for pattern in [&family.range, &family.single] {
            if let Some(found) = estimate(text, pattern, family.period) {
                return Some(found);
            }
        }
    }

    estimate(text, unmarked_range(), PayPeriod::Yearly)
}

fn estimate(text: &str, pattern: &Regex, period: PayPeriod) -> Option<SalaryEstimate> {
    let caps = pattern.captures(text)?;
    let amounts = captured_amounts(text, &caps);
    if amounts.is_empty() {
        return None;
    }
    let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
    let yearly = mean * period.yearly_factor();
    tracing::debug!(
        "salary {:?} matched {:?} pattern, amounts {:?} -> {yearly}",
        text,
        period,
        amounts
    );
    Some(SalaryEstimate {
        period,
        amounts,
        yearly,
    })
}

fn captured_amounts(text: &str, caps: &Captures<'_>) -> Vec<f64> {
    caps.iter()
        .skip(1)
        .flatten()
        .filter_map(|m| {
            let value: f64 = m.as_str().replace(',', "").parse().ok()?;
            Some(if has_thousands_suffix(text, m.end()) {
                value * 1000.0
            } else {
                value
            })
        })
        .collect()
}

/// Whether the character right after a captured number is the "K" shorthand.
fn has_thousands_suffix(text: &str, end: usize) -> bool {
    matches!(text[end..].chars().next(), Some('K' | 'k'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yearly_range_is_averaged() {
        assert_eq!(normalize_yearly("$90,000 - $100,000 a year"), Some(95_000.0));
    }

    #[test]
    fn test_hourly_single_value() {
        assert_eq!(normalize_yearly("$45/hour"), Some(93_600.0));
        assert_eq!(normalize_yearly("$30 an hour"), Some(62_400.0));
    }

    #[test]
    fn test_monthly_single_value() {
        assert_eq!(normalize_yearly("$6,000 a month"), Some(72_000.0));
    }

    #[test]
    fn test_k_shorthand() {
        assert_eq!(normalize_yearly("$95K a year"), Some(95_000.0));
        assert_eq!(normalize_yearly("$120K/yr - $150K/yr"), Some(135_000.0));
        assert_eq!(normalize_yearly("$80k - $100k per year"), Some(90_000.0));
    }

    #[test]
    fn test_hourly_range() {
        let estimate = parse_salary("$40 - $50 an hour").unwrap();
        assert_eq!(estimate.period, PayPeriod::Hourly);
        assert_eq!(estimate.amounts, vec![40.0, 50.0]);
        assert_eq!(estimate.yearly, 45.0 * HOURS_PER_YEAR);
    }

    #[test]
    fn test_yearly_family_wins_over_later_families() {
        let text = "$100,000 a year or $50 an hour for contractors";
        let estimate = parse_salary(text).unwrap();
        assert_eq!(estimate.period, PayPeriod::Yearly);
        assert_eq!(estimate.yearly, 100_000.0);
    }

    #[test]
    fn test_range_preferred_over_single_within_family() {
        let estimate = parse_salary("Pay: $85,000 annually or $90,000 - $110,000 a year").unwrap();
        assert_eq!(estimate.amounts, vec![90_000.0, 110_000.0]);
    }

    #[test]
    fn test_unmarked_range_defaults_to_yearly() {
        assert_eq!(normalize_yearly("$90,000 - $100,000"), Some(95_000.0));
        assert_eq!(normalize_yearly("$120K - $150K"), Some(135_000.0));

        let estimate = parse_salary("$40 - $50 an hour").unwrap();
        assert_eq!(estimate.period, PayPeriod::Hourly);
        let estimate = parse_salary("Salary: $5,000 - $6,000 monthly").unwrap();
        assert_eq!(estimate.period, PayPeriod::Monthly);
    }

    #[test]
    fn test_cents_and_newlines() {
        assert_eq!(normalize_yearly("$25.50\nper hour"), Some(25.5 * HOURS_PER_YEAR));
    }

    #[test]
    fn test_empty_and_garbage() {
        assert_eq!(normalize_yearly(""), None);
        assert_eq!(normalize_yearly("   "), None);
        assert_eq!(normalize_yearly("Competitive pay and benefits"), None);
        assert_eq!(normalize_yearly("$100,000"), None);
    }
}
