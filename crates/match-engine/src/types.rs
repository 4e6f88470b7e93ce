use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which fine-matching scorer `compute_all_matches` uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Sums +0.3 for each of postal/name_day/family equality.
    #[default]
    Toy,
    /// Weights comparator results (`family_name`/`given_name`/
    /// `middle_name`/`address`/`postal`) instead of raw field
    /// equality, giving partial credit for near-matches.
    Prod,
}

/// Tuning knobs for one matching run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MatchConfig {
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default = "MatchConfig::default_threshold")]
    pub threshold: f64,
    #[serde(default = "MatchConfig::default_slice_min")]
    pub slice_min: usize,
}

impl MatchConfig {
    pub fn default_threshold() -> f64 {
        0.5
    }

    pub fn default_slice_min() -> usize {
        comparators::DEFAULT_SLICE_MIN
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(MatchError::InvalidConfig(
                "threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if self.slice_min == 0 {
            return Err(MatchError::InvalidConfig(
                "slice_min must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            mode: MatchMode::default(),
            threshold: Self::default_threshold(),
            slice_min: Self::default_slice_min(),
        }
    }
}

/// Fine-match result for one ordered pair of demographics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FineMatchResult {
    pub candidate_record_id: i64,
    pub address_matching: bool,
    pub name_matching: bool,
    pub name_day_matching: bool,
    pub ssn_matching: bool,
    /// Reserved for a learned model; this engine never populates it.
    pub model_score: Option<f64>,
    pub score: f64,
    pub threshold: f64,
    #[serde(rename = "match")]
    pub is_match: bool,
    pub exec_time_secs: f64,
}

/// Errors produced by the matching layer.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    #[error("store error: {0}")]
    Store(#[from] store::StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = MatchConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.mode, MatchMode::Toy);
        assert_eq!(cfg.threshold, 0.5);
    }

    #[test]
    fn invalid_threshold_rejected() {
        let cfg = MatchConfig {
            threshold: 1.5,
            ..MatchConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_slice_min_rejected() {
        let cfg = MatchConfig {
            slice_min: 0,
            ..MatchConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
