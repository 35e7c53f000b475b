use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use xuanke_core::ReentryHook;

use crate::checker::StatusChecker;
use crate::login::LoginDriver;

/// Long-lived background loop: probe the session, re-login when it has
/// expired, then hand control back to the registration subsystem through
/// the re-entry hook. Never returns on its own; cancellation is dropping
/// the task.
pub struct SessionMaintainer {
    checker: Arc<StatusChecker>,
    driver: Arc<LoginDriver>,
    hook: Arc<dyn ReentryHook>,
}

impl SessionMaintainer {
    pub fn new(
        checker: Arc<StatusChecker>,
        driver: Arc<LoginDriver>,
        hook: Arc<dyn ReentryHook>,
    ) -> Self {
        Self {
            checker,
            driver,
            hook,
        }
    }

    pub async fn maintain(&self, check_interval: Duration) {
        info!(
            interval_seconds = check_interval.as_secs(),
            "session maintenance loop started"
        );
        loop {
            if !self.checker.check().await {
                match self.driver.login().await {
                    Ok(()) => {
                        // Hook failures are logged and swallowed; the next
                        // poll will find out whether anything is wrong.
                        if let Err(e) = self.hook.on_login().await {
                            warn!(error = %e, "re-entry hook failed after login");
                        }
                    }
                    Err(e) => warn!(error = %e, "login gave up"),
                }
            }
            tokio::time::sleep(check_interval).await;
        }
    }
}
