//! Outbound SMS text.

pub fn adjustment_notification(previous: f64, new: f64, ambient: f64) -> String {
    format!(
        "thermoguard: Temperature adjusted. Previous: {previous:.1}°F, New: {new:.1}°F, Ambient: {ambient:.1}°F"
    )
}

pub fn error_alert(error_count: u64, threshold: u64, last_error: &str) -> String {
    format!(
        "thermoguard ALERT: Error threshold exceeded. Errors: {error_count}/{threshold}. Last error: {last_error}"
    )
}

/// Short form used in notification events.
pub fn adjustment_summary(previous: f64, new: f64) -> String {
    format!("Adjustment: {previous}°F -> {new}°F")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_carries_all_three_temperatures() {
        let msg = adjustment_notification(75.0, 70.0, 72.34);
        assert_eq!(
            msg,
            "thermoguard: Temperature adjusted. Previous: 75.0°F, New: 70.0°F, Ambient: 72.3°F"
        );
    }

    #[test]
    fn alert_format() {
        assert_eq!(
            error_alert(10, 10, "service unavailable: 503"),
            "thermoguard ALERT: Error threshold exceeded. Errors: 10/10. Last error: service unavailable: 503"
        );
    }

    #[test]
    fn summary_format() {
        assert_eq!(adjustment_summary(75.0, 70.5), "Adjustment: 75°F -> 70.5°F");
    }
}
