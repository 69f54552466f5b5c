use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{error::ArbiterError, registry::INTERNAL_SOURCE_ID};

pub const MIN_TIMEOUT_MS: u64 = 20_000;
pub const MAX_TIMEOUT_MS: u64 = 3_600_000;
pub const MIN_ECHO_MS: u64 = 9_000;
pub const MAX_ECHO_MS: u64 = 1_800_000;
pub const MIN_TICK_INTERVAL_MS: u64 = 1_000;

/// Resolved settings for the temperature source arbiter. Built once at
/// startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Silence tolerated from an external source before falling back to the
    /// internal sensor. `0` disables the timeout.
    pub timeout_ms: u64,
    /// Keep-alive re-forward cadence. `0` disables echo.
    pub echo_ms: u64,
    pub tick_interval_ms: u64,
    /// External source ids, in registration order.
    pub sources: Vec<String>,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 480_000,
            echo_ms: 0,
            tick_interval_ms: 1_000,
            sources: Vec::new(),
        }
    }
}

impl ArbiterConfig {
    pub fn validate(&self) -> Result<(), ArbiterError> {
        if self.timeout_ms != 0 && !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ArbiterError::InvalidConfiguration(format!(
                "timeout_ms must be 0 or between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}, got {}",
                self.timeout_ms
            )));
        }

        if self.echo_ms != 0 && !(MIN_ECHO_MS..=MAX_ECHO_MS).contains(&self.echo_ms) {
            return Err(ArbiterError::InvalidConfiguration(format!(
                "echo_ms must be 0 or between {MIN_ECHO_MS} and {MAX_ECHO_MS}, got {}",
                self.echo_ms
            )));
        }

        if self.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(ArbiterError::InvalidConfiguration(format!(
                "tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}, got {}",
                self.tick_interval_ms
            )));
        }

        let mut seen = HashSet::new();
        for id in &self.sources {
            if id.trim().is_empty() {
                return Err(ArbiterError::InvalidConfiguration(
                    "source ids must not be empty".to_string(),
                ));
            }
            if id == INTERNAL_SOURCE_ID || !seen.insert(id.as_str()) {
                return Err(ArbiterError::DuplicateSource(id.clone()));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub arbiter: ArbiterConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_http_port() -> u16 {
    8080
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            arbiter: ArbiterConfig::default(),
            network: NetworkConfig::default(),
            http_port: default_http_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(timeout_ms: u64, echo_ms: u64) -> ArbiterConfig {
        ArbiterConfig {
            timeout_ms,
            echo_ms,
            ..ArbiterConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ArbiterConfig::default().validate(), Ok(()));
    }

    #[test]
    fn timeout_bounds_are_inclusive_and_zero_disables() {
        assert!(config(0, 0).validate().is_ok());
        assert!(config(20_000, 0).validate().is_ok());
        assert!(config(3_600_000, 0).validate().is_ok());
        assert!(matches!(
            config(19_999, 0).validate(),
            Err(ArbiterError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            config(3_600_001, 0).validate(),
            Err(ArbiterError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn echo_out_of_range_is_rejected_not_clamped() {
        assert!(config(30_000, 9_000).validate().is_ok());
        assert!(config(30_000, 1_800_000).validate().is_ok());
        assert!(config(30_000, 8_999).validate().is_err());
        assert!(config(30_000, 1_800_001).validate().is_err());
    }

    #[test]
    fn sub_second_tick_is_rejected() {
        let cfg = ArbiterConfig {
            tick_interval_ms: 500,
            ..ArbiterConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn duplicate_and_reserved_source_ids_are_rejected() {
        let cfg = ArbiterConfig {
            sources: vec!["kitchen".to_string(), "kitchen".to_string()],
            ..ArbiterConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ArbiterError::DuplicateSource("kitchen".to_string()))
        );

        let cfg = ArbiterConfig {
            sources: vec![INTERNAL_SOURCE_ID.to_string()],
            ..ArbiterConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ArbiterError::DuplicateSource(_))
        ));
    }

    #[test]
    fn runtime_config_fills_missing_sections() {
        let runtime: RuntimeConfig =
            serde_json::from_str(r#"{"arbiter":{"timeout_ms":30000,"sources":["kitchen"]}}"#)
                .unwrap();

        assert_eq!(runtime.arbiter.timeout_ms, 30_000);
        assert_eq!(runtime.arbiter.echo_ms, 0);
        assert_eq!(runtime.arbiter.tick_interval_ms, 1_000);
        assert_eq!(runtime.network.mqtt_port, 1883);
        assert_eq!(runtime.http_port, 8080);
    }
}
