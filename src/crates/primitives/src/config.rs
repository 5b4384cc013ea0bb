//! Detection tunables.
//!
//! A [`DetectionConfig`] is built once (defaults, a JSON file, CLI overrides)
//! and then passed by reference to every stage. Nothing reads tunables from
//! process-wide state.

use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::transaction::difference;

/// How the lead/follow time gap is compared against `allowed_time_difference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeDifferenceMode {
    /// `lead.time - follow.time <= allowed`. A follow that happens any amount
    /// of time after the lead passes, since the difference is negative.
    #[default]
    Signed,
    /// `|lead.time - follow.time| <= allowed`.
    Absolute,
}

impl TimeDifferenceMode {
    pub fn within(self, lead_time: i64, follow_time: i64, allowed: f64) -> bool {
        let diff = difference(lead_time, follow_time);
        let diff = match self {
            Self::Signed => diff,
            Self::Absolute => diff.abs(),
        };
        (diff as f64) <= allowed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum balance score for an account to become a similarity candidate.
    pub degree_constant: f64,
    /// Minimum structural similarity for two candidates to form a dense pair.
    pub dense_pair_constant: f64,
    /// Minimum amount of the lead transaction in a layering pair.
    pub amount_threshold: f64,
    /// Maximum `|lead.amount - follow.amount|`.
    pub allowed_amount_difference: f64,
    /// Maximum lead/follow time gap, see [`TimeDifferenceMode`].
    pub allowed_time_difference: f64,
    pub time_difference_mode: TimeDifferenceMode,
    /// Build only the lead hop of every pair (sender -> intermediate).
    pub demo: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            degree_constant: 0.1,
            dense_pair_constant: 0.2,
            amount_threshold: 10_000.0,
            allowed_amount_difference: 100.0,
            allowed_time_difference: 2.0,
            time_difference_mode: TimeDifferenceMode::Signed,
            demo: false,
        }
    }
}

impl DetectionConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::Parse)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("degree_constant", self.degree_constant),
            ("dense_pair_constant", self.dense_pair_constant),
            ("amount_threshold", self.amount_threshold),
            ("allowed_amount_difference", self.allowed_amount_difference),
            ("allowed_time_difference", self.allowed_time_difference),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be finite, got {value}"),
                });
            }
        }
        if self.allowed_amount_difference < 0.0 {
            return Err(ConfigError::Invalid {
                field: "allowed_amount_difference",
                reason: "must not be negative".to_string(),
            });
        }
        if self.time_difference_mode == TimeDifferenceMode::Absolute
            && self.allowed_time_difference < 0.0
        {
            return Err(ConfigError::Invalid {
                field: "allowed_time_difference",
                reason: "must not be negative in absolute mode".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid { field: &'static str, reason: String },
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config: {}", e),
            ConfigError::Parse(e) => write!(f, "malformed config: {}", e),
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid config value for {}: {}", field, reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_parameters() {
        let config = DetectionConfig::default();
        assert_eq!(config.degree_constant, 0.1);
        assert_eq!(config.dense_pair_constant, 0.2);
        assert_eq!(config.amount_threshold, 10_000.0);
        assert_eq!(config.allowed_amount_difference, 100.0);
        assert_eq!(config.allowed_time_difference, 2.0);
        assert_eq!(config.time_difference_mode, TimeDifferenceMode::Signed);
        assert!(!config.demo);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = DetectionConfig::from_json_str(
            r#"{ "dense_pair_constant": 0.5, "time_difference_mode": "absolute" }"#,
        )
        .unwrap();
        assert_eq!(config.dense_pair_constant, 0.5);
        assert_eq!(config.time_difference_mode, TimeDifferenceMode::Absolute);
        assert_eq!(config.degree_constant, 0.1);
    }

    #[test]
    fn json_file_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("detect.json");
        let config = DetectionConfig {
            amount_threshold: 5_000.0,
            demo: true,
            ..Default::default()
        };
        std::fs::write(&path, config.to_json_pretty()?)?;
        assert_eq!(DetectionConfig::from_json_file(&path)?, config);
        Ok(())
    }

    #[test]
    fn rejects_negative_amount_difference() {
        let err = DetectionConfig::from_json_str(r#"{ "allowed_amount_difference": -1.0 }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "allowed_amount_difference",
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = DetectionConfig::from_json_str(r#"{ "time_difference_mode": "sideways" }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn signed_mode_accepts_any_later_follow() {
        let signed = TimeDifferenceMode::Signed;
        assert!(signed.within(1, 2, 2.0));
        assert!(signed.within(1, 100, 2.0));
        assert!(signed.within(5, 3, 2.0));
        assert!(!signed.within(5, 2, 2.0));

        let absolute = TimeDifferenceMode::Absolute;
        assert!(absolute.within(1, 3, 2.0));
        assert!(!absolute.within(1, 100, 2.0));
        assert!(!absolute.within(5, 2, 2.0));
    }

    #[test]
    fn extreme_times_compare_without_wrapping() {
        assert!(TimeDifferenceMode::Signed.within(i64::MIN, 1, 2.0));
        assert!(!TimeDifferenceMode::Signed.within(i64::MAX, i64::MIN, 2.0));
        assert!(!TimeDifferenceMode::Absolute.within(i64::MIN, 1, 2.0));
        assert!(!TimeDifferenceMode::Absolute.within(i64::MIN, i64::MAX, 2.0));
    }
}
