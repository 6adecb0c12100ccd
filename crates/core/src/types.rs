use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use thermoguard_client::port::TemperatureReading;

/// One applied setpoint change, as kept in adjustment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentEvent {
    pub id: Uuid,
    pub previous_setting: f64,
    pub new_setting: f64,
    pub ambient_temperature: f64,
    pub trigger_reason: String,
    pub timestamp: DateTime<Utc>,
    pub thermostat_id: String,
    /// A send was planned for this adjustment. Informational only.
    pub notification_sent: bool,
}

impl AdjustmentEvent {
    pub fn new(
        previous_setting: f64,
        new_setting: f64,
        reading: &TemperatureReading,
        threshold: f64,
        timestamp: DateTime<Utc>,
        notification_sent: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            previous_setting,
            new_setting,
            ambient_temperature: reading.ambient_temperature,
            trigger_reason: format!(
                "Differential ({:.1}°F) below threshold ({:.1}°F)",
                reading.differential(),
                threshold
            ),
            timestamp,
            thermostat_id: reading.thermostat_id.clone(),
            notification_sent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Healthy,
    Degraded,
}

/// Health snapshot served on `/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthLevel,
    pub running: bool,
    pub uptime_seconds: u64,
    pub error_count: u64,
    pub consecutive_errors: u64,
    pub last_error: Option<String>,
    pub adjustment_count: u64,
    pub notification_count: u64,
    pub notifications_suppressed: u64,
    pub in_cooldown: bool,
    pub cooldown_remaining_seconds: u64,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthLevel::Healthy
    }
}

/// Readiness snapshot served on `/ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessStatus {
    pub ready: bool,
    pub thermostat_configured: bool,
    pub logging_configured: bool,
    pub config_loaded: bool,
}
