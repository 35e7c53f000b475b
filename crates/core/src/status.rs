use std::sync::Mutex;

/// What the last status probe told us about the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStatus {
    Authenticated,
    Unauthenticated,
    /// The probe answered but with an unrecognized encoding; callers treat
    /// this the same as not authenticated.
    Unknown,
}

impl LoginStatus {
    pub fn is_authenticated(self) -> bool {
        matches!(self, LoginStatus::Authenticated)
    }
}

/// Debounces status logging. The maintainer loop polls frequently, so a log
/// line per poll would drown everything else; only transitions are worth a
/// line. `None` means "never observed" (or reset after an error), and the
/// next observation is always log-worthy.
#[derive(Debug, Default)]
pub struct StatusTracker {
    last: Mutex<Option<LoginStatus>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation; returns true when it should be logged.
    pub fn observe(&self, status: LoginStatus) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let changed = *last != Some(status);
        *last = Some(status);
        changed
    }

    /// Forget the last observation so the next probe logs regardless of
    /// what it finds. Used after transport errors: a recovery must never be
    /// swallowed silently.
    pub fn reset(&self) {
        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn last(&self) -> Option<LoginStatus> {
        *self.last.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_is_log_worthy() {
        let tracker = StatusTracker::new();
        assert!(tracker.observe(LoginStatus::Authenticated));
    }

    #[test]
    fn test_repeated_observation_is_debounced() {
        let tracker = StatusTracker::new();
        assert!(tracker.observe(LoginStatus::Authenticated));
        assert!(!tracker.observe(LoginStatus::Authenticated));
        assert!(!tracker.observe(LoginStatus::Authenticated));
    }

    #[test]
    fn test_flip_always_logs() {
        let tracker = StatusTracker::new();
        assert!(tracker.observe(LoginStatus::Authenticated));
        assert!(tracker.observe(LoginStatus::Unauthenticated));
        assert!(tracker.observe(LoginStatus::Authenticated));
    }

    #[test]
    fn test_reset_forces_next_log() {
        let tracker = StatusTracker::new();
        assert!(tracker.observe(LoginStatus::Unauthenticated));
        assert!(!tracker.observe(LoginStatus::Unauthenticated));
        tracker.reset();
        assert!(tracker.observe(LoginStatus::Unauthenticated));
    }
}
