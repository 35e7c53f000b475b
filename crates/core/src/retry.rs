use std::time::Duration;

/// Retry policy as data, so a deliberate "retry forever, no backoff" reads
/// as a decision instead of a bare loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` = unbounded.
    pub max_attempts: Option<u32>,
    /// Pause between attempts; `None` = retry immediately.
    pub backoff: Option<Duration>,
}

impl RetryPolicy {
    /// The login default: wrong captcha guesses are expected and cheap, and
    /// the caller has no fallback path, so we keep trying until success.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            backoff: None,
        }
    }

    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff: None,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// May attempt number `attempt` (1-based) be started?
    pub fn allows(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt <= max,
            None => true,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_always_allows() {
        let policy = RetryPolicy::unbounded();
        assert!(policy.allows(1));
        assert!(policy.allows(1_000_000));
        assert_eq!(policy.backoff, None);
    }

    #[test]
    fn test_bounded_cuts_off() {
        let policy = RetryPolicy::bounded(3);
        assert!(policy.allows(1));
        assert!(policy.allows(3));
        assert!(!policy.allows(4));
    }

    #[test]
    fn test_backoff_is_carried() {
        let policy = RetryPolicy::bounded(2).with_backoff(Duration::from_millis(50));
        assert_eq!(policy.backoff, Some(Duration::from_millis(50)));
    }
}
