//! Google Smart Device Management thermostat client.
//!
//! Talks to the SDM REST API with a pre-issued bearer token. Readings are
//! converted to Fahrenheit; setpoint commands are sent in Celsius.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::port::{AdjustmentOutcome, ClientError, PortFuture, TemperatureReading, ThermostatPort};
use crate::retry::{self, BASE_RETRY_DELAY};

const DEFAULT_BASE_URL: &str = "https://smartdevicemanagement.googleapis.com/v1";
const THERMOSTAT_TYPE: &str = "sdm.devices.types.THERMOSTAT";
const MAX_READ_ATTEMPTS: u32 = 5;
const MAX_ADJUST_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Fallbacks when the device omits a trait value.
const DEFAULT_AMBIENT_C: f64 = 20.0;
const DEFAULT_SETPOINT_C: f64 = 21.0;

// ── SDM wire types ──

#[derive(Deserialize)]
struct DeviceList {
    #[serde(default)]
    devices: Vec<Device>,
}

#[derive(Deserialize)]
struct Device {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    traits: DeviceTraits,
}

#[derive(Deserialize, Default)]
struct DeviceTraits {
    #[serde(rename = "sdm.devices.traits.Temperature", default)]
    temperature: Option<TemperatureTrait>,
    #[serde(rename = "sdm.devices.traits.ThermostatTemperatureSetpoint", default)]
    setpoint: Option<SetpointTrait>,
    #[serde(rename = "sdm.devices.traits.Humidity", default)]
    humidity: Option<HumidityTrait>,
    #[serde(rename = "sdm.devices.traits.ThermostatMode", default)]
    mode: Option<ModeTrait>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemperatureTrait {
    ambient_temperature_celsius: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetpointTrait {
    heat_celsius: Option<f64>,
    cool_celsius: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HumidityTrait {
    ambient_humidity_percent: Option<f64>,
}

#[derive(Deserialize)]
struct ModeTrait {
    mode: Option<String>,
}

#[derive(Serialize)]
struct CommandRequest {
    command: &'static str,
    params: serde_json::Value,
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Build a reading from a device resource. Heat setpoint wins over cool.
fn reading_from_device(device: Device) -> TemperatureReading {
    let traits = device.traits;
    let ambient_c = traits
        .temperature
        .and_then(|t| t.ambient_temperature_celsius)
        .unwrap_or(DEFAULT_AMBIENT_C);
    let target_c = traits
        .setpoint
        .and_then(|s| s.heat_celsius.or(s.cool_celsius))
        .unwrap_or(DEFAULT_SETPOINT_C);

    TemperatureReading {
        ambient_temperature: round_tenth(celsius_to_fahrenheit(ambient_c)),
        target_temperature: round_tenth(celsius_to_fahrenheit(target_c)),
        thermostat_id: device.name,
        timestamp: Utc::now(),
        humidity: traits.humidity.and_then(|h| h.ambient_humidity_percent),
        hvac_mode: traits.mode.and_then(|m| m.mode),
    }
}

/// Setpoint command matching the device's current mode.
fn setpoint_command(hvac_mode: Option<&str>, target_f: f64) -> CommandRequest {
    let celsius = fahrenheit_to_celsius(target_f);
    if hvac_mode == Some("COOL") {
        CommandRequest {
            command: "sdm.devices.commands.ThermostatTemperatureSetpoint.SetCool",
            params: serde_json::json!({ "coolCelsius": celsius }),
        }
    } else {
        CommandRequest {
            command: "sdm.devices.commands.ThermostatTemperatureSetpoint.SetHeat",
            params: serde_json::json!({ "heatCelsius": celsius }),
        }
    }
}

// ── Client ──

/// SDM thermostat client. The device is discovered on first use unless configured.
pub struct NestClient {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    access_token: String,
    device: Mutex<Option<String>>,
}

impl NestClient {
    pub fn new(
        project_id: String,
        access_token: String,
        device_id: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        let base = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base.trim_end_matches('/').to_owned(),
            project_id,
            access_token,
            device: Mutex::new(device_id),
        }
    }

    fn devices_url(&self) -> String {
        format!("{}/enterprises/{}/devices", self.base_url, self.project_id)
    }

    fn device_url(&self, device: &str) -> String {
        format!("{}/{}", self.base_url, device)
    }

    fn command_url(&self, device: &str) -> String {
        format!("{}/{}:executeCommand", self.base_url, device)
    }

    fn cached_device(&self) -> Option<String> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn resolve_device(&self) -> Result<String, ClientError> {
        if let Some(device) = self.cached_device() {
            return Ok(device);
        }

        let resp = self
            .client
            .get(self.devices_url())
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ClientError::Unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(retry::status_error(status, text));
        }
        let list: DeviceList = resp
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        let device = list
            .devices
            .into_iter()
            .find(|d| d.kind.contains(THERMOSTAT_TYPE))
            .map(|d| d.name)
            .ok_or_else(|| ClientError::InvalidResponse("no thermostat found in the account".into()))?;

        tracing::info!(device = %device, "thermostat discovered");
        *self.device.lock().unwrap_or_else(PoisonError::into_inner) = Some(device.clone());
        Ok(device)
    }

    async fn fetch_reading(&self) -> Result<TemperatureReading, ClientError> {
        let device = self.resolve_device().await?;
        let resp = self
            .client
            .get(self.device_url(&device))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ClientError::Unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(retry::status_error(status, text));
        }
        let device: Device = resp
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(reading_from_device(device))
    }

    async fn execute_setpoint(&self, device: &str, command: &CommandRequest) -> Result<(), ClientError> {
        let resp = self
            .client
            .post(self.command_url(device))
            .bearer_auth(&self.access_token)
            .json(command)
            .send()
            .await
            .map_err(|e| ClientError::Unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(retry::status_error(status, text));
        }
        Ok(())
    }

    async fn read_with_retry(&self) -> Result<TemperatureReading, ClientError> {
        retry::with_retry("thermostat_read", MAX_READ_ATTEMPTS, BASE_RETRY_DELAY, || {
            self.fetch_reading()
        })
        .await
    }

    async fn adjust(&self, target: f64) -> Result<AdjustmentOutcome, ClientError> {
        let current = self.read_with_retry().await?;
        let previous = current.target_temperature;
        let command = setpoint_command(current.hvac_mode.as_deref(), target);

        let result = retry::with_retry("thermostat_adjust", MAX_ADJUST_ATTEMPTS, BASE_RETRY_DELAY, || {
            self.execute_setpoint(&current.thermostat_id, &command)
        })
        .await;

        Ok(match result {
            Ok(()) => {
                tracing::info!(previous, new = target, "temperature adjustment applied");
                AdjustmentOutcome::applied(previous, target)
            }
            Err(e) => AdjustmentOutcome::rejected(
                previous,
                target,
                format!("failed after {MAX_ADJUST_ATTEMPTS} attempts: {e}"),
            ),
        })
    }
}

impl ThermostatPort for NestClient {
    fn name(&self) -> &str {
        "nest-sdm"
    }

    fn get_reading(&self) -> PortFuture<'_, Result<TemperatureReading, ClientError>> {
        Box::pin(self.read_with_retry())
    }

    fn set_temperature(&self, target: f64) -> PortFuture<'_, Result<AdjustmentOutcome, ClientError>> {
        Box::pin(self.adjust(target))
    }
}

/// Build a client from `NEST_PROJECT_ID`, `NEST_ACCESS_TOKEN`, and optionally
/// `NEST_DEVICE_ID` / `NEST_API_BASE`. Returns `None` if project or token is unset.
pub fn from_env() -> Option<NestClient> {
    let project_id = std::env::var("NEST_PROJECT_ID").ok().filter(|v| !v.is_empty())?;
    let token = std::env::var("NEST_ACCESS_TOKEN").ok().filter(|v| !v.is_empty())?;
    let device = std::env::var("NEST_DEVICE_ID").ok().filter(|v| !v.is_empty());
    let base_url = std::env::var("NEST_API_BASE").ok();
    Some(NestClient::new(project_id, token, device, base_url))
}
