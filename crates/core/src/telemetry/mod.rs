//! Typed monitor events and the sinks that receive them.

pub mod metrics;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

use crate::types::{AdjustmentEvent, TemperatureReading};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TemperatureReading,
    TemperatureAdjustment,
    NotificationSent,
    NotificationFailed,
    ApiError,
    AgentStarted,
    AgentStopped,
    Custom,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TemperatureReading => "temperature_reading",
            Self::TemperatureAdjustment => "temperature_adjustment",
            Self::NotificationSent => "notification_sent",
            Self::NotificationFailed => "notification_failed",
            Self::ApiError => "api_error",
            Self::AgentStarted => "agent_started",
            Self::AgentStopped => "agent_stopped",
            Self::Custom => "custom",
        }
    }
}

/// Outcome of one notification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Masked phone number.
    pub recipient: String,
    pub message_summary: String,
    pub success: bool,
    pub error_message: Option<String>,
    pub previous_setting: f64,
    pub new_setting: f64,
    pub ambient_temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub operation: String,
    pub error: String,
    pub error_count: u64,
    pub consecutive_errors: u64,
}

/// Monitor start/stop context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub uptime_seconds: u64,
    pub polling_interval_secs: u64,
    pub adjustment_count: u64,
    pub notification_count: u64,
    pub error_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    TemperatureReading(TemperatureReading),
    TemperatureAdjustment(AdjustmentEvent),
    NotificationSent(NotificationRecord),
    NotificationFailed(NotificationRecord),
    ApiError(ErrorRecord),
    AgentStarted(LifecycleRecord),
    AgentStopped(LifecycleRecord),
    Custom(serde_json::Map<String, serde_json::Value>),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::TemperatureReading(_) => EventKind::TemperatureReading,
            Self::TemperatureAdjustment(_) => EventKind::TemperatureAdjustment,
            Self::NotificationSent(_) => EventKind::NotificationSent,
            Self::NotificationFailed(_) => EventKind::NotificationFailed,
            Self::ApiError(_) => EventKind::ApiError,
            Self::AgentStarted(_) => EventKind::AgentStarted,
            Self::AgentStopped(_) => EventKind::AgentStopped,
            Self::Custom(_) => EventKind::Custom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    #[serde(flatten)]
    pub payload: EventPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LogEvent {
    pub fn new(severity: Severity, payload: EventPayload) -> Self {
        Self { timestamp: Utc::now(), severity, payload, message: None }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("event rejected: {0}")]
    Rejected(String),
    #[error("flush failed: {0}")]
    Flush(String),
}

/// Destination for monitor events. Delivery is best effort; the monitor logs
/// and drops sink errors.
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    async fn record(&self, event: LogEvent) -> Result<(), SinkError>;

    async fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Renders events as structured `tracing` records at their severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait::async_trait]
impl EventSink for TracingSink {
    async fn record(&self, event: LogEvent) -> Result<(), SinkError> {
        let kind = event.kind().as_str();
        let data = match &event.payload {
            EventPayload::Custom(map) => serde_json::Value::Object(map.clone()),
            other => serde_json::to_value(other)
                .map_err(|e| SinkError::Rejected(e.to_string()))?
                .get("data")
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        };
        let message = event.message.as_deref().unwrap_or(kind);

        match event.severity {
            Severity::Debug => tracing::debug!(event_type = kind, %data, "{message}"),
            Severity::Info => tracing::info!(event_type = kind, %data, "{message}"),
            Severity::Warning => tracing::warn!(event_type = kind, %data, "{message}"),
            Severity::Error | Severity::Critical => {
                tracing::error!(event_type = kind, severity = ?event.severity, %data, "{message}")
            }
        }
        Ok(())
    }
}

/// Keeps every event in memory. Used by tests and local inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LogEvent>>,
    flushes: Mutex<u32>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(LogEvent::kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn flush_count(&self) -> u32 {
        *self.flushes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl EventSink for RecordingSink {
    async fn record(&self, event: LogEvent) -> Result<(), SinkError> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
        Ok(())
    }

    async fn flush(&self) -> Result<(), SinkError> {
        *self.flushes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
