//! Credential lifecycle configuration.
//!
//! Values come from the environment through a lookup function so tests can
//! feed a map instead of mutating the process environment.

use std::time::Duration as StdDuration;

use chrono::Duration;
use thiserror::Error;

pub const ENV_ACCESS_TTL_SECS: &str = "CREDO_ACCESS_TTL_SECS";
pub const ENV_REFRESH_TTL_SECS: &str = "CREDO_REFRESH_TTL_SECS";
pub const ENV_RETENTION_DAYS: &str = "CREDO_RETENTION_DAYS";
pub const ENV_OVERUSE_THRESHOLD: &str = "CREDO_OVERUSE_THRESHOLD";
pub const ENV_RECENT_USAGE_SECS: &str = "CREDO_RECENT_USAGE_SECS";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "CREDO_SWEEP_INTERVAL_SECS";

/// Upper bound for every configured duration (ten years). Keeps `now ± d`
/// far away from the edges of the timestamp range.
pub const MAX_DURATION_DAYS: i64 = 3650;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: '{value}' is not a valid {expected}")]
    Parse {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{key} must be positive")]
    NotPositive { key: &'static str },

    #[error("{key} must not exceed {max} days", max = MAX_DURATION_DAYS)]
    TooLarge { key: &'static str },

    #[error("{0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// How long terminal records are kept before the sweeper deletes them.
    pub retention: Duration,
    /// Rotations above this count are reported as an anomaly (never denied).
    pub overuse_threshold: u64,
    pub recent_usage_window: Duration,
    pub sweep_interval: StdDuration,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            access_ttl: Duration::hours(24),
            refresh_ttl: Duration::days(7),
            retention: Duration::days(30),
            overuse_threshold: 100,
            recent_usage_window: Duration::days(1),
            sweep_interval: StdDuration::from_secs(24 * 60 * 60),
        }
    }
}

impl CredentialConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup; missing keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = read_positive(&lookup, ENV_ACCESS_TTL_SECS)? {
            config.access_ttl = seconds(ENV_ACCESS_TTL_SECS, secs)?;
        }
        if let Some(secs) = read_positive(&lookup, ENV_REFRESH_TTL_SECS)? {
            config.refresh_ttl = seconds(ENV_REFRESH_TTL_SECS, secs)?;
        }
        if let Some(days) = read_positive(&lookup, ENV_RETENTION_DAYS)? {
            config.retention = i64::try_from(days)
                .ok()
                .and_then(Duration::try_days)
                .ok_or_else(|| out_of_range(ENV_RETENTION_DAYS, days))?;
        }
        if let Some(threshold) = read_positive(&lookup, ENV_OVERUSE_THRESHOLD)? {
            config.overuse_threshold = threshold;
        }
        if let Some(secs) = read_positive(&lookup, ENV_RECENT_USAGE_SECS)? {
            config.recent_usage_window = seconds(ENV_RECENT_USAGE_SECS, secs)?;
        }
        if let Some(secs) = read_positive(&lookup, ENV_SWEEP_INTERVAL_SECS)? {
            config.sweep_interval = StdDuration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            (ENV_ACCESS_TTL_SECS, self.access_ttl),
            (ENV_REFRESH_TTL_SECS, self.refresh_ttl),
            (ENV_RETENTION_DAYS, self.retention),
            (ENV_RECENT_USAGE_SECS, self.recent_usage_window),
        ];
        let max = Duration::days(MAX_DURATION_DAYS);
        for (key, value) in positive {
            if value <= Duration::zero() {
                return Err(ConfigError::NotPositive { key });
            }
            if value > max {
                return Err(ConfigError::TooLarge { key });
            }
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::NotPositive {
                key: ENV_SWEEP_INTERVAL_SECS,
            });
        }
        if max.to_std().is_ok_and(|max| self.sweep_interval > max) {
            return Err(ConfigError::TooLarge {
                key: ENV_SWEEP_INTERVAL_SECS,
            });
        }
        if self.access_ttl >= self.refresh_ttl {
            return Err(ConfigError::Inconsistent(format!(
                "access TTL ({}s) must be shorter than refresh TTL ({}s)",
                self.access_ttl.num_seconds(),
                self.refresh_ttl.num_seconds()
            )));
        }
        Ok(())
    }
}

fn read_positive<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let value: u64 = raw.trim().parse().map_err(|_| ConfigError::Parse {
        key,
        value: raw.clone(),
        expected: "non-negative integer",
    })?;
    if value == 0 {
        return Err(ConfigError::NotPositive { key });
    }
    Ok(Some(value))
}

fn seconds(key: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| out_of_range(key, secs))
}

fn out_of_range(key: &'static str, value: u64) -> ConfigError {
    ConfigError::Parse {
        key,
        value: value.to_string(),
        expected: "duration in range",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = CredentialConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CredentialConfig::default());
        assert_eq!(config.overuse_threshold, 100);
        assert_eq!(config.retention, Duration::days(30));
    }

    #[test]
    fn overrides_are_read() {
        let config = CredentialConfig::from_lookup(lookup(&[
            (ENV_ACCESS_TTL_SECS, "900"),
            (ENV_REFRESH_TTL_SECS, "86400"),
            (ENV_RETENTION_DAYS, "7"),
            (ENV_OVERUSE_THRESHOLD, "5"),
            (ENV_SWEEP_INTERVAL_SECS, "60"),
        ]))
        .unwrap();
        assert_eq!(config.access_ttl, Duration::minutes(15));
        assert_eq!(config.refresh_ttl, Duration::days(1));
        assert_eq!(config.retention, Duration::days(7));
        assert_eq!(config.overuse_threshold, 5);
        assert_eq!(config.sweep_interval, StdDuration::from_secs(60));
    }

    #[test]
    fn access_ttl_must_be_shorter_than_refresh_ttl() {
        let err = CredentialConfig::from_lookup(lookup(&[
            (ENV_ACCESS_TTL_SECS, "3600"),
            (ENV_REFRESH_TTL_SECS, "3600"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Inconsistent(_)));
    }

    #[test]
    fn rejects_zero_and_garbage() {
        let err = CredentialConfig::from_lookup(lookup(&[(ENV_RETENTION_DAYS, "0")])).unwrap_err();
        assert_eq!(err, ConfigError::NotPositive { key: ENV_RETENTION_DAYS });

        let err = CredentialConfig::from_lookup(lookup(&[(ENV_ACCESS_TTL_SECS, "ten")])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { key: ENV_ACCESS_TTL_SECS, .. }));
    }

    #[test]
    fn rejects_durations_beyond_ten_years() {
        let err = CredentialConfig::from_lookup(lookup(&[
            (ENV_ACCESS_TTL_SECS, "9000000000000000"),
            (ENV_REFRESH_TTL_SECS, "9000000000000001"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::TooLarge { key: ENV_ACCESS_TTL_SECS });

        let err = CredentialConfig::from_lookup(lookup(&[(ENV_RETENTION_DAYS, "3651")])).unwrap_err();
        assert_eq!(err, ConfigError::TooLarge { key: ENV_RETENTION_DAYS });

        let err = CredentialConfig::from_lookup(lookup(&[(ENV_SWEEP_INTERVAL_SECS, "400000000")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::TooLarge { key: ENV_SWEEP_INTERVAL_SECS });

        let at_bound = (MAX_DURATION_DAYS * 86_400).to_string();
        assert!(CredentialConfig::from_lookup(lookup(&[(ENV_REFRESH_TTL_SECS, at_bound.as_str())])).is_ok());
    }

    proptest::proptest! {
        #[test]
        fn ttl_pair_accepted_iff_access_is_shorter(access in 1u64..10_000_000, refresh in 1u64..10_000_000) {
            let access_raw = access.to_string();
            let refresh_raw = refresh.to_string();
            let result = CredentialConfig::from_lookup(lookup(&[
                (ENV_ACCESS_TTL_SECS, access_raw.as_str()),
                (ENV_REFRESH_TTL_SECS, refresh_raw.as_str()),
            ]));
            proptest::prop_assert_eq!(result.is_ok(), access < refresh);
        }
    }
}
