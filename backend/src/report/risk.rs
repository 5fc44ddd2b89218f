use shared::{RiskTier, TumorClass};

use crate::inference::Confidence;

pub const HIGH_PRIORITY_PCT: f32 = 90.0;
pub const MODERATE_PCT: f32 = 75.0;

/// Thresholds are inclusive and compared on the percentage.
pub fn assess_risk(label: &str, confidence: Confidence) -> RiskTier {
    if label.trim().eq_ignore_ascii_case(TumorClass::NoTumor.as_ref()) {
        return RiskTier::Healthy;
    }
    risk_for_percent(confidence.percent())
}

pub fn risk_for_percent(confidence_pct: f32) -> RiskTier {
    if confidence_pct >= HIGH_PRIORITY_PCT {
        RiskTier::HighPriority
    } else if confidence_pct >= MODERATE_PCT {
        RiskTier::Moderate
    } else {
        RiskTier::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(risk_for_percent(90.0), RiskTier::HighPriority);
        assert_eq!(risk_for_percent(89.999), RiskTier::Moderate);
        assert_eq!(risk_for_percent(75.0), RiskTier::Moderate);
        assert_eq!(risk_for_percent(74.999), RiskTier::Low);
    }

    #[test]
    fn test_notumor_is_always_healthy() {
        for c in [0.0, 0.3, 0.76, 0.9, 1.0] {
            assert_eq!(assess_risk("notumor", Confidence::new(c)), RiskTier::Healthy);
        }
    }

    #[test]
    fn test_monotonic_in_confidence() {
        for class in [TumorClass::Glioma, TumorClass::Meningioma, TumorClass::Pituitary] {
            let mut previous = RiskTier::Low;
            for step in 0..=1000 {
                let tier = assess_risk(class.as_ref(), Confidence::new(step as f32 / 1000.0));
                assert!(tier >= previous, "{class} regressed at step {step}");
                assert_ne!(tier, RiskTier::Healthy);
                previous = tier;
            }
        }
    }

    #[test]
    fn test_glioma_high_confidence() {
        assert_eq!(
            assess_risk("glioma", Confidence::new(0.97)),
            RiskTier::HighPriority
        );
    }

    #[test]
    fn test_unknown_label_uses_thresholds() {
        assert_eq!(assess_risk("unknownclass", Confidence::new(0.8)), RiskTier::Moderate);
    }
}
