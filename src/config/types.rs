//! Small value types shared by configuration and reports

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// How the betas inside one recurring window are summarised.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AggregateMethod {
    #[default]
    Mean,
    Median,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Beta(f64);

impl Beta {
    pub const fn new(val: f64) -> Self {
        Self(val)
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Beta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Signed price change as a fraction (0.05 == +5%).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ChangePct(f64);

impl ChangePct {
    pub const fn new(val: f64) -> Self {
        Self(val)
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// (last - first) / first
    pub fn calculate(last: f64, first: f64) -> Self {
        if first > f64::EPSILON {
            Self::new((last - first) / first)
        } else {
            Self::new(0.0)
        }
    }

    /// Percentage points, e.g. 5.0 for +5%.
    pub fn as_percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl std::fmt::Display for ChangePct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+.2}%", self.0 * 100.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
pub enum RiskLevel {
    Low,
    Medium,
    Normal,
    High,
}

impl RiskLevel {
    pub const LOW_MAX: f64 = 0.5;
    pub const MEDIUM_MAX: f64 = 0.8;
    pub const NORMAL_MAX: f64 = 1.2;

    pub fn from_beta(beta: Beta) -> Self {
        let b = beta.value();
        if b <= Self::LOW_MAX {
            Self::Low
        } else if b <= Self::MEDIUM_MAX {
            Self::Medium
        } else if b <= Self::NORMAL_MAX {
            Self::Normal
        } else {
            Self::High
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_bins_are_inclusive_on_the_upper_bound() {
        assert_eq!(RiskLevel::from_beta(Beta::new(-0.3)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_beta(Beta::new(0.5)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_beta(Beta::new(0.8)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_beta(Beta::new(1.2)), RiskLevel::Normal);
        assert_eq!(RiskLevel::from_beta(Beta::new(1.21)), RiskLevel::High);
    }

    #[test]
    fn change_pct_displays_signed() {
        let up = ChangePct::calculate(105.0, 100.0);
        assert!((up.value() - 0.05).abs() < 1e-12);
        assert_eq!(up.to_string(), "+5.00%");
        assert_eq!(ChangePct::calculate(1.0, 0.0).value(), 0.0);
    }

    #[test]
    fn aggregate_method_parses_lowercase() {
        use std::str::FromStr;
        assert_eq!(AggregateMethod::from_str("median").ok(), Some(AggregateMethod::Median));
        assert_eq!(AggregateMethod::default().to_string(), "mean");
    }
}
