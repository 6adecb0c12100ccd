use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A single poll result from the thermostat. All temperatures are Fahrenheit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub ambient_temperature: f64,
    pub target_temperature: f64,
    pub thermostat_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub humidity: Option<f64>,
    /// HEAT, COOL, HEATCOOL or OFF as reported by the device.
    #[serde(default)]
    pub hvac_mode: Option<String>,
}

impl TemperatureReading {
    pub fn new(
        ambient_temperature: f64,
        target_temperature: f64,
        thermostat_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            ambient_temperature,
            target_temperature,
            thermostat_id: thermostat_id.into(),
            timestamp,
            humidity: None,
            hvac_mode: None,
        }
    }

    /// Signed gap between setpoint and room temperature.
    pub fn differential(&self) -> f64 {
        self.target_temperature - self.ambient_temperature
    }
}

/// Result of asking the thermostat for a new setpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentOutcome {
    pub success: bool,
    pub previous_target: f64,
    pub new_target: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AdjustmentOutcome {
    pub fn applied(previous_target: f64, new_target: f64) -> Self {
        Self { success: true, previous_target, new_target, error_message: None }
    }

    pub fn rejected(previous_target: f64, new_target: f64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            previous_target,
            new_target,
            error_message: Some(error.into()),
        }
    }
}

/// Result of a notification send. Transports report failure here instead of erroring.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SendOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SendOutcome {
    pub fn sent(message_id: impl Into<String>) -> Self {
        Self { success: true, message_id: Some(message_id.into()), error_message: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, message_id: None, error_message: Some(error.into()) }
    }
}

/// Error type for thermostat and notifier transports.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("rate limited")]
    RateLimited,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("no thermostat data available")]
    NoData,
}

impl ClientError {
    /// Whether another attempt may succeed without operator action.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Unauthorized(_))
    }
}

pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read/adjust access to a single thermostat.
pub trait ThermostatPort: Send + Sync {
    fn name(&self) -> &str;

    fn get_reading(&self) -> PortFuture<'_, Result<TemperatureReading, ClientError>>;

    fn set_temperature(&self, target: f64) -> PortFuture<'_, Result<AdjustmentOutcome, ClientError>>;
}

/// Outbound text notifications (SMS).
pub trait NotifierPort: Send + Sync {
    /// Recipient in a form safe for logs.
    fn recipient_masked(&self) -> String;

    fn send(&self, message: String) -> PortFuture<'_, SendOutcome>;
}

/// Mask a phone number for logging, keeping only the last four digits.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() >= 4 {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("***-***-{tail}")
    } else {
        "****".to_owned()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Mocks ──

enum ReadStep {
    Reading(TemperatureReading),
    Fail(ClientError),
    Panic,
}

/// Scripted thermostat for tests. Readings are served in push order; an empty
/// script yields `ClientError::NoData`.
#[derive(Default)]
pub struct MockThermostat {
    script: Mutex<VecDeque<ReadStep>>,
    set_failures: Mutex<VecDeque<ClientError>>,
    set_calls: Mutex<Vec<f64>>,
    last_target: Mutex<Option<f64>>,
}

impl MockThermostat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reading(&self, reading: TemperatureReading) {
        lock(&self.script).push_back(ReadStep::Reading(reading));
    }

    pub fn push_failure(&self, error: ClientError) {
        lock(&self.script).push_back(ReadStep::Fail(error));
    }

    /// The next read panics inside the port call.
    pub fn push_panic(&self) {
        lock(&self.script).push_back(ReadStep::Panic);
    }

    /// The next `set_temperature` call fails with `error`.
    pub fn fail_next_set(&self, error: ClientError) {
        lock(&self.set_failures).push_back(error);
    }

    /// Targets passed to `set_temperature`, in call order.
    pub fn set_calls(&self) -> Vec<f64> {
        lock(&self.set_calls).clone()
    }
}

impl ThermostatPort for MockThermostat {
    fn name(&self) -> &str {
        "mock"
    }

    fn get_reading(&self) -> PortFuture<'_, Result<TemperatureReading, ClientError>> {
        let step = lock(&self.script).pop_front();
        let result = match step {
            Some(ReadStep::Reading(r)) => {
                *lock(&self.last_target) = Some(r.target_temperature);
                Ok(r)
            }
            Some(ReadStep::Fail(e)) => Err(e),
            Some(ReadStep::Panic) => panic!("scripted thermostat panic"),
            None => Err(ClientError::NoData),
        };
        Box::pin(async move { result })
    }

    fn set_temperature(&self, target: f64) -> PortFuture<'_, Result<AdjustmentOutcome, ClientError>> {
        lock(&self.set_calls).push(target);
        let previous = lock(&self.last_target).unwrap_or(target);
        let result = match lock(&self.set_failures).pop_front() {
            Some(e) => Err(e),
            None => {
                *lock(&self.last_target) = Some(target);
                Ok(AdjustmentOutcome::applied(previous, target))
            }
        };
        Box::pin(async move { result })
    }
}

/// Recording notifier for tests.
pub struct MockNotifier {
    succeed: AtomicBool,
    delay: Option<Duration>,
    sent: Mutex<Vec<String>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self { succeed: AtomicBool::new(true), delay: None, sent: Mutex::new(Vec::new()) }
    }

    /// A notifier whose sends take `delay` before completing.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::new() }
    }

    pub fn set_succeed(&self, succeed: bool) {
        self.succeed.store(succeed, Ordering::SeqCst);
    }

    /// Every message handed to `send`, including failed ones.
    pub fn messages(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifierPort for MockNotifier {
    fn recipient_masked(&self) -> String {
        mask_phone("5550000")
    }

    fn send(&self, message: String) -> PortFuture<'_, SendOutcome> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let n = {
                let mut sent = lock(&self.sent);
                sent.push(message);
                sent.len()
            };
            if self.succeed.load(Ordering::SeqCst) {
                SendOutcome::sent(format!("mock-{n}"))
            } else {
                SendOutcome::failed("mock transport failure")
            }
        })
    }
}
