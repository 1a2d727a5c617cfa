use serde::Deserialize;

use crate::models::{RiskAssessment, RiskTier};

pub const DEFAULT_LOW_THRESHOLD: f64 = 10.0;
pub const DEFAULT_HIGH_THRESHOLD: f64 = 50.0;

/// Percent boundaries between the risk tiers.
///
/// Medium covers `[low_threshold, high_threshold]`, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RiskThresholds {
    #[serde(default = "default_low")]
    pub low_threshold: f64,
    #[serde(default = "default_high")]
    pub high_threshold: f64,
}

fn default_low() -> f64 {
    DEFAULT_LOW_THRESHOLD
}

fn default_high() -> f64 {
    DEFAULT_HIGH_THRESHOLD
}

impl Default for RiskThresholds {
    fn default() -> Self {
        RiskThresholds {
            low_threshold: DEFAULT_LOW_THRESHOLD,
            high_threshold: DEFAULT_HIGH_THRESHOLD,
        }
    }
}

impl RiskThresholds {
    /// Reject thresholds outside `0 <= low <= high <= 100`.
    pub fn validate(&self) -> Result<(), String> {
        let (low, high) = (self.low_threshold, self.high_threshold);
        if !(low.is_finite() && high.is_finite()) {
            return Err("risk thresholds must be finite numbers".to_string());
        }
        if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) {
            return Err(format!(
                "risk thresholds must lie within 0..=100 (got low={low}, high={high})"
            ));
        }
        if low > high {
            return Err(format!(
                "low_threshold ({low}) must not exceed high_threshold ({high})"
            ));
        }
        Ok(())
    }
}

/// Map a melanoma percentage to its risk tier.
pub fn classify(percent: f64, thresholds: &RiskThresholds) -> RiskTier {
    if percent < thresholds.low_threshold {
        RiskTier::Low
    } else if percent <= thresholds.high_threshold {
        RiskTier::Medium
    } else {
        RiskTier::High
    }
}

/// Bundle a melanoma percentage with its tier.
pub fn assess(percent: f64, thresholds: &RiskThresholds) -> RiskAssessment {
    RiskAssessment {
        percent,
        tier: classify(percent, thresholds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        let t = RiskThresholds::default();
        assert_eq!(classify(9.9, &t), RiskTier::Low);
        assert_eq!(classify(10.0, &t), RiskTier::Medium);
        assert_eq!(classify(50.0, &t), RiskTier::Medium);
        assert_eq!(classify(50.1, &t), RiskTier::High);
    }

    #[test]
    fn test_extremes() {
        let t = RiskThresholds::default();
        assert_eq!(classify(0.0, &t), RiskTier::Low);
        assert_eq!(classify(100.0, &t), RiskTier::High);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = RiskThresholds {
            low_threshold: 5.0,
            high_threshold: 20.0,
        };
        assert_eq!(classify(4.9, &t), RiskTier::Low);
        assert_eq!(classify(20.0, &t), RiskTier::Medium);
        assert_eq!(classify(20.5, &t), RiskTier::High);
    }

    #[test]
    fn test_validate() {
        assert!(RiskThresholds::default().validate().is_ok());
        let inverted = RiskThresholds {
            low_threshold: 60.0,
            high_threshold: 50.0,
        };
        assert!(inverted.validate().is_err());
        let out_of_range = RiskThresholds {
            low_threshold: 10.0,
            high_threshold: 150.0,
        };
        assert!(out_of_range.validate().is_err());
    }
}
