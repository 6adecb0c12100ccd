//! Prometheus text exposition of the monitor snapshot.

use std::fmt::Write;

use crate::types::{HealthStatus, TemperatureReading};

fn metric(out: &mut String, name: &str, kind: &str, help: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "# HELP thermoguard_{name} {help}");
    let _ = writeln!(out, "# TYPE thermoguard_{name} {kind}");
    let _ = writeln!(out, "thermoguard_{name} {value}");
}

/// Render the health snapshot and, when available, the latest reading.
pub fn render_prometheus(health: &HealthStatus, latest: Option<&TemperatureReading>) -> String {
    let mut out = String::new();

    metric(&mut out, "up", "gauge", "Whether the monitoring loop is running.", u8::from(health.running));
    metric(&mut out, "uptime_seconds", "gauge", "Seconds since the monitor started.", health.uptime_seconds);
    metric(&mut out, "error_count_total", "counter", "Cumulative monitoring errors.", health.error_count);
    metric(&mut out, "consecutive_errors", "gauge", "Errors since the last successful cycle.", health.consecutive_errors);
    metric(&mut out, "adjustment_count_total", "counter", "Temperature adjustments applied.", health.adjustment_count);
    metric(&mut out, "notification_count_total", "counter", "Notifications sent.", health.notification_count);
    metric(
        &mut out,
        "notifications_suppressed_total",
        "counter",
        "Notifications suppressed by rate limiting.",
        health.notifications_suppressed,
    );
    metric(&mut out, "in_cooldown", "gauge", "Whether adjustments are paused by cooldown.", u8::from(health.in_cooldown));
    metric(
        &mut out,
        "cooldown_remaining_seconds",
        "gauge",
        "Seconds until adjustments are allowed again.",
        health.cooldown_remaining_seconds,
    );
    metric(&mut out, "health_status", "gauge", "1 when healthy, 0 when degraded.", u8::from(health.is_healthy()));

    if let Some(r) = latest {
        metric(
            &mut out,
            "ambient_temperature",
            "gauge",
            "Latest ambient temperature in Fahrenheit.",
            format_args!("{:.1}", r.ambient_temperature),
        );
        metric(
            &mut out,
            "target_temperature",
            "gauge",
            "Latest target temperature in Fahrenheit.",
            format_args!("{:.1}", r.target_temperature),
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HealthLevel;
    use chrono::Utc;

    fn health() -> HealthStatus {
        HealthStatus {
            status: HealthLevel::Healthy,
            running: true,
            uptime_seconds: 120,
            error_count: 3,
            consecutive_errors: 0,
            last_error: None,
            adjustment_count: 2,
            notification_count: 1,
            notifications_suppressed: 1,
            in_cooldown: true,
            cooldown_remaining_seconds: 900,
        }
    }

    #[test]
    fn renders_counters_and_gauges() {
        let text = render_prometheus(&health(), None);
        assert!(text.contains("# TYPE thermoguard_error_count_total counter\n"));
        assert!(text.contains("thermoguard_up 1\n"));
        assert!(text.contains("thermoguard_error_count_total 3\n"));
        assert!(text.contains("thermoguard_cooldown_remaining_seconds 900\n"));
        assert!(text.contains("thermoguard_health_status 1\n"));
        assert!(!text.contains("ambient_temperature"));
    }

    #[test]
    fn includes_temperatures_when_read() {
        let reading = TemperatureReading::new(71.6, 75.2, "t1", Utc::now());
        let mut h = health();
        h.status = HealthLevel::Degraded;
        let text = render_prometheus(&h, Some(&reading));
        assert!(text.contains("thermoguard_ambient_temperature 71.6\n"));
        assert!(text.contains("thermoguard_target_temperature 75.2\n"));
        assert!(text.contains("thermoguard_health_status 0\n"));
    }
}
