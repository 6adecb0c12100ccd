use serde::{Deserialize, Serialize};

/// Monitor lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Constructed, never started.
    #[default]
    Idle,
    Running,
    ShuttingDown,
    Stopped,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    #[error("monitor is already running")]
    AlreadyRunning,
}

/// Phase entered by `start()`.
pub fn on_start(phase: Phase) -> Result<Phase, MonitorError> {
    match phase {
        Phase::Idle | Phase::Stopped => Ok(Phase::Running),
        Phase::Running | Phase::ShuttingDown => Err(MonitorError::AlreadyRunning),
    }
}

/// Phase entered by `stop()`, or `None` when the request is a no-op.
pub fn on_stop(phase: Phase) -> Option<Phase> {
    match phase {
        Phase::Running => Some(Phase::ShuttingDown),
        Phase::Idle | Phase::ShuttingDown | Phase::Stopped => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        assert_eq!(on_start(Phase::Idle), Ok(Phase::Running));
        assert_eq!(on_start(Phase::Stopped), Ok(Phase::Running));
        assert_eq!(on_start(Phase::Running), Err(MonitorError::AlreadyRunning));
        assert_eq!(on_start(Phase::ShuttingDown), Err(MonitorError::AlreadyRunning));

        assert_eq!(on_stop(Phase::Running), Some(Phase::ShuttingDown));
        // repeated or premature stop requests are ignored
        assert_eq!(on_stop(Phase::ShuttingDown), None);
        assert_eq!(on_stop(Phase::Idle), None);
        assert_eq!(on_stop(Phase::Stopped), None);
    }
}
