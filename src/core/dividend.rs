//! Dividend yield abstractions

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const YIELD_ITEMS: [&str; 2] = ["股息率", "dividend yield"];

/// Yields outside this open range are treated as retrieval failures.
pub const MAX_PLAUSIBLE_YIELD: f64 = 15.0;

/// One `item`/`value` line of a fund profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileItem {
    pub item: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DividendProfile {
    pub items: Vec<ProfileItem>,
}

impl DividendProfile {
    pub fn yield_field(&self) -> Option<&str> {
        self.items
            .iter()
            .find(|p| {
                let item = p.item.trim().to_lowercase();
                YIELD_ITEMS.iter().any(|name| item == *name)
            })
            .map(|p| p.value.as_str())
    }

    /// Extracts a plausible dividend yield percentage, rounded to 2 decimals.
    pub fn dividend_yield(&self) -> Result<f64> {
        let raw = self
            .yield_field()
            .ok_or_else(|| anyhow!("No dividend yield in fund profile"))?;
        parse_yield_percentage(raw)
    }
}

/// Parses a percentage string such as `"4.56%"`. The value must carry a `%`
/// sign and, once rounded to 2 decimals, fall strictly between 0 and
/// [`MAX_PLAUSIBLE_YIELD`].
pub fn parse_yield_percentage(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if !raw.contains('%') {
        return Err(anyhow!("Dividend yield is not a percentage: '{raw}'"));
    }
    let value: f64 = raw
        .trim_matches('%')
        .trim()
        .parse()
        .map_err(|e| anyhow!("Failed to parse dividend yield '{raw}': {e}"))?;
    let rounded = (value * 100.0).round() / 100.0;
    if !is_plausible_yield(rounded) {
        return Err(anyhow!("Implausible dividend yield: {value}%"));
    }
    Ok(rounded)
}

/// True for percentages strictly between 0 and [`MAX_PLAUSIBLE_YIELD`].
pub fn is_plausible_yield(value: f64) -> bool {
    value > 0.0 && value < MAX_PLAUSIBLE_YIELD
}

#[async_trait]
pub trait DividendProvider: Send + Sync {
    async fn fetch_dividend_profile(&self, code: &str) -> Result<DividendProfile>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(pairs: &[(&str, &str)]) -> DividendProfile {
        DividendProfile {
            items: pairs
                .iter()
                .map(|(item, value)| ProfileItem {
                    item: item.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_yield_percentage() {
        assert_eq!(parse_yield_percentage("4.567%").unwrap(), 4.57);
        assert_eq!(parse_yield_percentage(" 3% ").unwrap(), 3.0);
        assert!(parse_yield_percentage("4.5").is_err());
        assert!(parse_yield_percentage("abc%").is_err());
    }

    #[test]
    fn test_parse_yield_rejects_implausible_values() {
        for raw in ["0%", "-1.2%", "15%", "15.01%", "120%", "14.996%", "0.004%"] {
            assert!(parse_yield_percentage(raw).is_err(), "{raw} should fail");
        }
        assert_eq!(parse_yield_percentage("14.99%").unwrap(), 14.99);
        assert_eq!(parse_yield_percentage("14.994%").unwrap(), 14.99);
        assert_eq!(parse_yield_percentage("0.005%").unwrap(), 0.01);
    }

    #[test]
    fn test_profile_dividend_yield() {
        let p = profile(&[("基金规模", "10亿"), ("股息率", "5.12%")]);
        assert_eq!(p.dividend_yield().unwrap(), 5.12);

        let p = profile(&[("Dividend Yield", "3.3%")]);
        assert_eq!(p.dividend_yield().unwrap(), 3.3);

        let p = profile(&[("基金规模", "10亿")]);
        assert_eq!(
            p.dividend_yield().unwrap_err().to_string(),
            "No dividend yield in fund profile"
        );
    }
}
