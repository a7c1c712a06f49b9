//! Recorder lifecycle state machine

/// Lifecycle state of a recorder.
///
/// Transitions are validated to keep lifecycle behavior consistent: a
/// recorder runs from construction, drains through `Flushing` during
/// shutdown, and can never be restarted once `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// Not yet constructed (encoders and workers not started).
    Uninitialized,

    /// Workers are running and frames are being accepted.
    Running,

    /// Shutdown requested; queued work and codec-buffered frames are being
    /// drained through the normal fan-out path.
    Flushing,

    /// Workers joined, writers released. Terminal.
    Stopped,
}

impl RecorderState {
    /// Check whether a transition to `target` is valid.
    pub fn can_transition_to(&self, target: &RecorderState) -> bool {
        use RecorderState::*;

        match (self, target) {
            (Uninitialized, Running) => true,
            (Running, Flushing) => true,
            (Flushing, Stopped) => true,

            // No transitions out of Stopped.
            (Stopped, _) => false,

            // Self-transitions
            (a, b) if a == b => true,

            _ => false,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RecorderState::Running)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, RecorderState::Stopped | RecorderState::Flushing)
    }

    pub fn description(&self) -> &'static str {
        match self {
            RecorderState::Uninitialized => "Uninitialized",
            RecorderState::Running => "Running",
            RecorderState::Flushing => "Flushing",
            RecorderState::Stopped => "Stopped",
        }
    }
}

impl std::fmt::Display for RecorderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(RecorderState::Uninitialized.can_transition_to(&RecorderState::Running));
        assert!(RecorderState::Running.can_transition_to(&RecorderState::Flushing));
        assert!(RecorderState::Flushing.can_transition_to(&RecorderState::Stopped));

        // Self-transitions
        assert!(RecorderState::Running.can_transition_to(&RecorderState::Running));
    }

    #[test]
    fn test_invalid_transitions() {
        // Shutdown always drains; skipping Flushing is not allowed.
        assert!(!RecorderState::Running.can_transition_to(&RecorderState::Stopped));

        // Terminal state.
        assert!(!RecorderState::Stopped.can_transition_to(&RecorderState::Running));
        assert!(!RecorderState::Stopped.can_transition_to(&RecorderState::Uninitialized));

        // No restart paths.
        assert!(!RecorderState::Flushing.can_transition_to(&RecorderState::Running));
    }

    #[test]
    fn test_state_checks() {
        assert!(RecorderState::Running.is_running());
        assert!(!RecorderState::Running.is_stopped());
        assert!(RecorderState::Flushing.is_stopped());
        assert!(RecorderState::Stopped.is_stopped());
    }
}
