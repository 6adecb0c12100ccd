use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Monitor parameters. Loaded from the process environment at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // polling
    pub polling_interval_secs: u64,

    // adjustment rule
    pub cooldown_period_secs: u64,
    pub temperature_threshold: f64,
    pub temperature_adjustment: f64,

    // http surface
    pub http_port: u16,

    // error alerting
    pub error_threshold: u64,

    // notifications
    pub notification_rate_limit_enabled: bool,
    pub notification_rate_limit_secs: u64,

    // shutdown
    pub shutdown_timeout_secs: u64,
    pub alert_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            polling_interval_secs: 60,
            cooldown_period_secs: 1800,
            temperature_threshold: 5.0,
            temperature_adjustment: 5.0,
            http_port: 8080,
            error_threshold: 10,
            notification_rate_limit_enabled: true,
            notification_rate_limit_secs: 3600,
            shutdown_timeout_secs: 30,
            alert_timeout_secs: 30,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("configuration validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

impl Config {
    /// Read every known key from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let map: HashMap<String, String> = std::env::vars().collect();
        Self::from_map(&map)
    }

    /// Missing keys take defaults; present keys must parse.
    pub fn from_map(m: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let d = Self::default();
        Ok(Self {
            polling_interval_secs: get_or(m, "POLLING_INTERVAL", d.polling_interval_secs)?,
            cooldown_period_secs: get_or(m, "COOLDOWN_PERIOD", d.cooldown_period_secs)?,
            temperature_threshold: get_or(m, "TEMPERATURE_THRESHOLD", d.temperature_threshold)?,
            temperature_adjustment: get_or(m, "TEMPERATURE_ADJUSTMENT", d.temperature_adjustment)?,
            http_port: get_or(m, "HTTP_PORT", d.http_port)?,
            error_threshold: get_or(m, "ERROR_THRESHOLD", d.error_threshold)?,
            notification_rate_limit_enabled: get_bool_or(
                m,
                "NOTIFICATION_RATE_LIMIT_ENABLED",
                d.notification_rate_limit_enabled,
            )?,
            notification_rate_limit_secs: get_or(
                m,
                "NOTIFICATION_RATE_LIMIT_SECONDS",
                d.notification_rate_limit_secs,
            )?,
            shutdown_timeout_secs: get_or(m, "SHUTDOWN_TIMEOUT_SECONDS", d.shutdown_timeout_secs)?,
            alert_timeout_secs: get_or(m, "ALERT_TIMEOUT_SECONDS", d.alert_timeout_secs)?,
        })
    }

    /// Check every range at once so the operator sees all problems in one run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !(10..=3600).contains(&self.polling_interval_secs) {
            errors.push(format!(
                "POLLING_INTERVAL must be between 10 and 3600 seconds, got {}",
                self.polling_interval_secs
            ));
        }
        if !(60..=86400).contains(&self.cooldown_period_secs) {
            errors.push(format!(
                "COOLDOWN_PERIOD must be between 60 and 86400 seconds, got {}",
                self.cooldown_period_secs
            ));
        }
        if !(1.0..=20.0).contains(&self.temperature_threshold) {
            errors.push(format!(
                "TEMPERATURE_THRESHOLD must be between 1.0 and 20.0, got {}",
                self.temperature_threshold
            ));
        }
        if !(1.0..=20.0).contains(&self.temperature_adjustment) {
            errors.push(format!(
                "TEMPERATURE_ADJUSTMENT must be between 1.0 and 20.0, got {}",
                self.temperature_adjustment
            ));
        }
        if self.http_port == 0 {
            errors.push("HTTP_PORT must be between 1 and 65535".to_owned());
        }
        if self.error_threshold < 1 {
            errors.push("ERROR_THRESHOLD must be at least 1".to_owned());
        }
        if self.notification_rate_limit_secs < 1 {
            errors.push("NOTIFICATION_RATE_LIMIT_SECONDS must be at least 1".to_owned());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn alert_timeout(&self) -> Duration {
        Duration::from_secs(self.alert_timeout_secs)
    }

    /// Log the effective settings once at startup.
    pub fn log_summary(&self) {
        for (key, value) in self.to_entries() {
            tracing::info!(key, value = %value, "config");
        }
    }

    fn to_entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("polling_interval_secs", self.polling_interval_secs.to_string()),
            ("cooldown_period_secs", self.cooldown_period_secs.to_string()),
            ("temperature_threshold", self.temperature_threshold.to_string()),
            ("temperature_adjustment", self.temperature_adjustment.to_string()),
            ("http_port", self.http_port.to_string()),
            ("error_threshold", self.error_threshold.to_string()),
            ("notification_rate_limit_enabled", self.notification_rate_limit_enabled.to_string()),
            ("notification_rate_limit_secs", self.notification_rate_limit_secs.to_string()),
            ("shutdown_timeout_secs", self.shutdown_timeout_secs.to_string()),
            ("alert_timeout_secs", self.alert_timeout_secs.to_string()),
        ]
    }
}

fn get_or<T: FromStr>(map: &HashMap<String, String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match map.get(key) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: v.clone() }),
    }
}

fn get_bool_or(map: &HashMap<String, String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Some(v) = map.get(key) else {
        return Ok(default);
    };
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value: v.clone() }),
    }
}
