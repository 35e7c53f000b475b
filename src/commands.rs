pub mod courses;
pub mod run;
pub mod session;

use std::sync::Arc;

use anyhow::{Context, Result};
use url::Url;

use xuanke_captcha::{CaptchaSolver, TesseractClassifier};
use xuanke_core::config::AppConfig;
use xuanke_core::{CredentialStore, PortalTransport, ReentryHook, RetryPolicy};
use xuanke_courses::RoundEntryHook;
use xuanke_session::{HttpTransport, LoginDriver, StatusChecker};

/// Everything a command needs to talk to the portal, built once from the
/// loaded config.
pub struct Portal {
    pub config: AppConfig,
    pub base: Url,
    pub credentials: Arc<CredentialStore>,
    pub transport: Arc<dyn PortalTransport>,
    pub solver: CaptchaSolver,
}

impl Portal {
    pub fn new(config: AppConfig) -> Result<Self> {
        // Url::join treats a path without a trailing slash as a file, which
        // would silently drop the /jsxsd segment.
        let mut base_url = config.portal.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base = Url::parse(&base_url)
            .with_context(|| format!("invalid base_url {}", config.portal.base_url))?;

        let credentials = Arc::new(CredentialStore::new(
            config.portal.username.clone(),
            config.portal.password.clone(),
            config.portal.cookies.clone(),
        ));
        let transport: Arc<dyn PortalTransport> =
            Arc::new(HttpTransport::new(&config.session, credentials.clone())?);
        let solver = CaptchaSolver::new(Arc::new(TesseractClassifier::new()), &config.captcha);

        Ok(Self {
            config,
            base,
            credentials,
            transport,
            solver,
        })
    }

    pub fn checker(&self) -> Result<Arc<StatusChecker>> {
        Ok(Arc::new(StatusChecker::new(
            self.transport.clone(),
            &self.base,
        )?))
    }

    pub fn driver(&self) -> Result<Arc<LoginDriver>> {
        Ok(Arc::new(LoginDriver::new(
            self.transport.clone(),
            self.solver.clone(),
            self.credentials.clone(),
            &self.base,
            RetryPolicy::unbounded(),
        )?))
    }

    pub fn reentry_hook(&self) -> Arc<dyn ReentryHook> {
        Arc::new(RoundEntryHook::new(self.transport.clone(), self.base.clone()))
    }
}
