use serde::{Deserialize, Serialize};

use crate::SpectrumError;

/// How runs of tied neighbouring maxima are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakPolicy {
    /// Every index that equals its window maximum is a peak, so a flat top
    /// yields one peak per sample.
    #[default]
    KeepTies,
    /// Of each run of index-adjacent peaks sharing the same intensity, keep
    /// only the first.
    SuppressPlateaus,
}

/// Configuration for [`detect_peaks`](crate::detect_peaks).
///
/// # Example
/// ```
/// use spectrum::{PeakConfig, PeakPolicy};
///
/// let cfg = PeakConfig {
///     window: 3,
///     threshold: 0.5,
///     policy: PeakPolicy::SuppressPlateaus,
/// };
/// cfg.validate().unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Half-width of the neighbourhood; the comparison window is
    /// `[i - window, i + window]`.
    pub window: usize,
    /// Minimum intensity a local maximum needs to count as a peak.
    pub threshold: f64,
    pub policy: PeakPolicy,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            window: 5,
            threshold: 0.2,
            policy: PeakPolicy::KeepTies,
        }
    }
}

impl PeakConfig {
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_policy(mut self, policy: PeakPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), SpectrumError> {
        if !self.threshold.is_finite() {
            return Err(SpectrumError::InvalidThreshold {
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = PeakConfig::default();
        assert_eq!(cfg.window, 5);
        assert_eq!(cfg.threshold, 0.2);
        assert_eq!(cfg.policy, PeakPolicy::KeepTies);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let cfg = PeakConfig::default().with_threshold(f64::NAN);
        assert!(matches!(
            cfg.validate(),
            Err(SpectrumError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: PeakConfig = serde_json::from_str(r#"{"window": 2}"#).unwrap();
        assert_eq!(cfg.window, 2);
        assert_eq!(cfg.threshold, 0.2);

        let cfg: PeakConfig =
            serde_json::from_str(r#"{"policy": "suppress_plateaus"}"#).unwrap();
        assert_eq!(cfg.policy, PeakPolicy::SuppressPlateaus);
    }
}
