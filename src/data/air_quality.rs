//! CO2 air quality rules.
//!
//! Contains the alert policy applied to every accepted CO2 sample and the
//! coarse air quality bands used when presenting CO2 readings.

/// Default CO2 level (ppm) above which the bad-air alert is shown.
pub const DEFAULT_CO2_ALERT_THRESHOLD: f64 = 1400.0;

/// Alert decision for the latest CO2 value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum AlertDecision {
    /// Show the bad-air notification.
    Show,
    /// Remove the bad-air notification.
    Hide,
}

impl AlertDecision {
    /// Check if the alert should be visible.
    pub fn is_show(&self) -> bool {
        matches!(self, Self::Show)
    }
}

/// Decides whether the CO2 alert is shown.
///
/// The policy is stateless: suppressing a repeated `Show` is up to whoever
/// displays the notification.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct NotificationPolicy {
    threshold: f64,
}

impl NotificationPolicy {
    /// Create a policy with a custom threshold (ppm).
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The alert threshold in ppm.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// `Show` when `latest_co2` is strictly above the threshold.
    pub fn decide(&self, latest_co2: f64) -> AlertDecision {
        if latest_co2 > self.threshold {
            AlertDecision::Show
        } else {
            AlertDecision::Hide
        }
    }
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CO2_ALERT_THRESHOLD)
    }
}

/// Indoor air quality band for a CO2 reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum AirQuality {
    /// Below 800 ppm.
    Good,
    /// 800 to below 1000 ppm.
    Moderate,
    /// 1000 to below 1400 ppm.
    Poor,
    /// 1400 ppm and above.
    Bad,
}

impl AirQuality {
    /// Classify a CO2 concentration in ppm.
    pub fn from_co2(ppm: f64) -> Self {
        if ppm < 800.0 {
            Self::Good
        } else if ppm < 1000.0 {
            Self::Moderate
        } else if ppm < 1400.0 {
            Self::Poor
        } else {
            Self::Bad
        }
    }
}

impl std::fmt::Display for AirQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "Good"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Poor => write!(f, "Poor"),
            Self::Bad => write!(f, "Bad"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_boundary() {
        let policy = NotificationPolicy::default();
        assert_eq!(policy.decide(1399.0), AlertDecision::Hide);
        assert_eq!(policy.decide(1400.0), AlertDecision::Hide);
        assert_eq!(policy.decide(1401.0), AlertDecision::Show);
        assert_eq!(policy.decide(1400.01), AlertDecision::Show);
    }

    #[test]
    fn test_custom_threshold() {
        let policy = NotificationPolicy::new(1000.0);
        assert_eq!(policy.threshold(), 1000.0);
        assert!(policy.decide(1000.5).is_show());
        assert!(!policy.decide(999.0).is_show());
    }

    #[test]
    fn test_air_quality_bands() {
        assert_eq!(AirQuality::from_co2(420.0), AirQuality::Good);
        assert_eq!(AirQuality::from_co2(799.99), AirQuality::Good);
        assert_eq!(AirQuality::from_co2(800.0), AirQuality::Moderate);
        assert_eq!(AirQuality::from_co2(1000.0), AirQuality::Poor);
        assert_eq!(AirQuality::from_co2(1399.0), AirQuality::Poor);
        assert_eq!(AirQuality::from_co2(1400.0), AirQuality::Bad);
        assert!(AirQuality::Good < AirQuality::Bad);
    }

    #[test]
    fn test_air_quality_display() {
        assert_eq!(AirQuality::Moderate.to_string(), "Moderate");
    }
}
