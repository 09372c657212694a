//! Light client configuration.
//!
//! Everything here is fixed at construction. The chain id pins which chain
//! headers may come from; the trust level, trust period and clock drift tune
//! how much the client is willing to believe without a direct hash chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default trust period: 14 days.
pub const DEFAULT_TRUST_PERIOD_SECONDS: u64 = 14 * 24 * 60 * 60;

/// Default tolerance for headers timestamped ahead of the local clock.
pub const DEFAULT_MAX_CLOCK_DRIFT_SECONDS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Chain id must not be empty")]
    EmptyChainId,

    #[error("Trust period must be greater than zero")]
    ZeroTrustPeriod,

    #[error("Trust level {numerator}/{denominator} is outside [1/3, 2/3]")]
    InvalidTrustLevel { numerator: u64, denominator: u64 },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Fraction of a trusted validator set's power that must re-sign a
/// non-adjacent header before it is believed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustThreshold {
    pub numerator: u64,
    pub denominator: u64,
}

impl TrustThreshold {
    pub const ONE_THIRD: Self = Self {
        numerator: 1,
        denominator: 3,
    };

    pub const TWO_THIRDS: Self = Self {
        numerator: 2,
        denominator: 3,
    };

    pub fn new(numerator: u64, denominator: u64) -> Result<Self, ConfigError> {
        let threshold = Self {
            numerator,
            denominator,
        };
        threshold.validate()?;
        Ok(threshold)
    }

    /// Accepts fractions in [1/3, 2/3]. Below 1/3 a single honest-looking
    /// minority could vouch for a header; above 2/3 the overlap check is
    /// stricter than the commit check itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.numerator as u128;
        let d = self.denominator as u128;
        if d == 0 || n * 3 < d || n * 3 > d * 2 {
            return Err(ConfigError::InvalidTrustLevel {
                numerator: self.numerator,
                denominator: self.denominator,
            });
        }
        Ok(())
    }

    /// `tallied >= total * numerator / denominator`, compared exactly.
    pub fn is_enough_power(&self, tallied: u64, total: u64) -> bool {
        tallied as u128 * self.denominator as u128 >= total as u128 * self.numerator as u128
    }
}

impl Default for TrustThreshold {
    fn default() -> Self {
        Self::ONE_THIRD
    }
}

impl fmt::Display for TrustThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Whether bisection also insists on timestamp monotonicity.
///
/// Sequential verification always does. For bisection the trusted state being
/// compared against may be above or below the untrusted height, so by default
/// the check is skipped; `Strict` enforces ordering in both directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BisectionTimestampPolicy {
    #[default]
    Lenient,
    Strict,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightClientConfig {
    /// Every verified header must carry exactly this chain id.
    pub chain_id: String,
    #[serde(default)]
    pub trust_level: TrustThreshold,
    #[serde(default = "default_trust_period")]
    pub trust_period_seconds: u64,
    #[serde(default = "default_max_clock_drift")]
    pub max_clock_drift_seconds: u64,
    /// Check each commit signature against the signer's public key before
    /// counting its power. Turning this off reduces commit verification to a
    /// voting-power tally and is only meant for pre-verified input.
    #[serde(default = "default_verify_signatures")]
    pub verify_signatures: bool,
    #[serde(default)]
    pub bisection_timestamp_policy: BisectionTimestampPolicy,
}

fn default_trust_period() -> u64 {
    DEFAULT_TRUST_PERIOD_SECONDS
}

fn default_max_clock_drift() -> u64 {
    DEFAULT_MAX_CLOCK_DRIFT_SECONDS
}

fn default_verify_signatures() -> bool {
    true
}

impl LightClientConfig {
    /// Default settings for `chain_id`.
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            trust_level: TrustThreshold::default(),
            trust_period_seconds: DEFAULT_TRUST_PERIOD_SECONDS,
            max_clock_drift_seconds: DEFAULT_MAX_CLOCK_DRIFT_SECONDS,
            verify_signatures: true,
            bisection_timestamp_policy: BisectionTimestampPolicy::default(),
        }
    }

    /// Parse and validate a JSON config. Only `chain_id` is required.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id.is_empty() {
            return Err(ConfigError::EmptyChainId);
        }
        if self.trust_period_seconds == 0 {
            return Err(ConfigError::ZeroTrustPeriod);
        }
        self.trust_level.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LightClientConfig::new("cosmoshub-4");
        assert_eq!(config.trust_level, TrustThreshold::ONE_THIRD);
        assert_eq!(config.trust_period_seconds, 1_209_600);
        assert_eq!(config.max_clock_drift_seconds, 10);
        assert!(config.verify_signatures);
        assert_eq!(config.bisection_timestamp_policy, BisectionTimestampPolicy::Lenient);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = LightClientConfig::from_json_str(
            r#"{"chain_id": "osmosis-1", "trust_period_seconds": 600, "bisection_timestamp_policy": "strict"}"#,
        )
        .unwrap();
        assert_eq!(config.chain_id, "osmosis-1");
        assert_eq!(config.trust_period_seconds, 600);
        assert_eq!(config.max_clock_drift_seconds, DEFAULT_MAX_CLOCK_DRIFT_SECONDS);
        assert_eq!(config.bisection_timestamp_policy, BisectionTimestampPolicy::Strict);
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert!(matches!(
            LightClientConfig::from_json_str(r#"{"trust_period_seconds": 5}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            LightClientConfig::from_json_str(r#"{"chain_id": ""}"#),
            Err(ConfigError::EmptyChainId)
        ));
        assert!(matches!(
            LightClientConfig::from_json_str(r#"{"chain_id": "c", "trust_period_seconds": 0}"#),
            Err(ConfigError::ZeroTrustPeriod)
        ));
    }

    #[test]
    fn test_trust_level_bounds() {
        assert!(TrustThreshold::new(1, 3).is_ok());
        assert!(TrustThreshold::new(2, 3).is_ok());
        assert!(TrustThreshold::new(1, 2).is_ok());
        assert!(TrustThreshold::new(1, 4).is_err());
        assert!(TrustThreshold::new(3, 4).is_err());
        assert!(TrustThreshold::new(1, 0).is_err());
    }

    #[test]
    fn test_is_enough_power_exact() {
        let third = TrustThreshold::ONE_THIRD;
        assert!(third.is_enough_power(30, 90));
        assert!(!third.is_enough_power(29, 90));
        // No rounding down of the requirement
        assert!(!third.is_enough_power(33, 100));
        assert!(third.is_enough_power(34, 100));
        assert!(third.is_enough_power(u64::MAX / 3 + 1, u64::MAX));
    }
}
