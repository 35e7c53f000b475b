use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use xuanke_core::{LoginStatus, PortalError, PortalTransport, StatusTracker};

/// Authenticated-only page probed to tell whether the session is alive.
const STATUS_PATH: &str = "framework/main.jsp";

/// Classifies the session by the charset the portal declares on its main
/// frame: UTF-8 for an authenticated session, GBK for the anonymous login
/// shell. Anything else is unknown.
pub struct StatusChecker {
    transport: Arc<dyn PortalTransport>,
    probe_url: Url,
    tracker: StatusTracker,
}

impl StatusChecker {
    pub fn new(transport: Arc<dyn PortalTransport>, base: &Url) -> Result<Self, PortalError> {
        let probe_url = base
            .join(STATUS_PATH)
            .map_err(|e| PortalError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            transport,
            probe_url,
            tracker: StatusTracker::new(),
        })
    }

    /// One HEAD probe; true = authenticated. Logs only when the tracker
    /// says the observation is news. Transport errors report
    /// not-authenticated and reset the tracker so the next probe always
    /// logs whatever it finds.
    pub async fn check(&self) -> bool {
        match self.transport.head(&self.probe_url).await {
            Ok(resp) => {
                let status = classify_content_type(resp.content_type.as_deref());
                if self.tracker.observe(status) {
                    match status {
                        LoginStatus::Authenticated => {
                            info!(response_time_ms = resp.response_time_ms, "已登录");
                        }
                        LoginStatus::Unauthenticated => {
                            info!(response_time_ms = resp.response_time_ms, "未登录");
                        }
                        LoginStatus::Unknown => {
                            warn!(
                                content_type = resp.content_type.as_deref().unwrap_or(""),
                                "login state unclear from status probe"
                            );
                        }
                    }
                }
                status.is_authenticated()
            }
            Err(e) => {
                warn!(error = %e, "status check failed");
                self.tracker.reset();
                false
            }
        }
    }
}

pub fn classify_content_type(content_type: Option<&str>) -> LoginStatus {
    let Some(ct) = content_type else {
        return LoginStatus::Unknown;
    };
    let ct = ct.to_lowercase();
    if ct.contains("utf-8") {
        LoginStatus::Authenticated
    } else if ct.contains("gbk") {
        LoginStatus::Unauthenticated
    } else {
        LoginStatus::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use xuanke_core::{ExtraHeaders, PortalResponse};

    #[test]
    fn test_classify_charset_tokens() {
        assert_eq!(
            classify_content_type(Some("text/html;charset=utf-8")),
            LoginStatus::Authenticated
        );
        assert_eq!(
            classify_content_type(Some("text/html;charset=GBK")),
            LoginStatus::Unauthenticated
        );
        assert_eq!(
            classify_content_type(Some("text/html")),
            LoginStatus::Unknown
        );
        assert_eq!(classify_content_type(None), LoginStatus::Unknown);
    }

    /// HEAD answers with a fixed content type; GET/POST are unused here.
    struct ProbeTransport {
        content_type: Mutex<Option<String>>,
        fail: Mutex<bool>,
    }

    impl ProbeTransport {
        fn answering(content_type: &str) -> Self {
            Self {
                content_type: Mutex::new(Some(content_type.to_string())),
                fail: Mutex::new(false),
            }
        }
    }

    fn head_response(url: &Url, content_type: Option<String>) -> PortalResponse {
        PortalResponse {
            url: url.clone(),
            final_url: url.clone(),
            status: 200,
            headers: HashMap::new(),
            body: Vec::new(),
            content_type,
            fetched_at: chrono::Utc::now(),
            response_time_ms: 3,
        }
    }

    #[async_trait]
    impl PortalTransport for ProbeTransport {
        async fn get(
            &self,
            _url: &Url,
            _extra: ExtraHeaders<'_>,
        ) -> Result<PortalResponse, PortalError> {
            unreachable!("status checker only issues HEAD requests")
        }

        async fn post_form(
            &self,
            _url: &Url,
            _body: String,
            _extra: ExtraHeaders<'_>,
        ) -> Result<PortalResponse, PortalError> {
            unreachable!("status checker only issues HEAD requests")
        }

        async fn head(&self, url: &Url) -> Result<PortalResponse, PortalError> {
            if *self.fail.lock().unwrap() {
                return Err(PortalError::Network("connection reset".into()));
            }
            Ok(head_response(url, self.content_type.lock().unwrap().clone()))
        }
    }

    fn base() -> Url {
        Url::parse("http://jwxt.gdufe.edu.cn/jsxsd/").unwrap()
    }

    #[tokio::test]
    async fn test_utf8_charset_means_authenticated() {
        let transport = Arc::new(ProbeTransport::answering("text/html;charset=utf-8"));
        let checker = StatusChecker::new(transport, &base()).unwrap();

        assert!(checker.check().await);
        // Second identical probe: same answer, debounced internally.
        assert!(checker.check().await);
        assert_eq!(checker.tracker.last(), Some(LoginStatus::Authenticated));
    }

    #[tokio::test]
    async fn test_gbk_charset_means_unauthenticated() {
        let transport = Arc::new(ProbeTransport::answering("text/html;charset=GBK"));
        let checker = StatusChecker::new(transport, &base()).unwrap();

        assert!(!checker.check().await);
        assert_eq!(checker.tracker.last(), Some(LoginStatus::Unauthenticated));
    }

    #[tokio::test]
    async fn test_transport_error_resets_the_tracker() {
        let transport = Arc::new(ProbeTransport::answering("text/html;charset=utf-8"));
        let checker = StatusChecker::new(transport.clone(), &base()).unwrap();

        assert!(checker.check().await);
        *transport.fail.lock().unwrap() = true;
        assert!(!checker.check().await);
        // Reset means the next successful probe logs again even if the
        // status is unchanged from before the error.
        assert_eq!(checker.tracker.last(), None);

        *transport.fail.lock().unwrap() = false;
        assert!(checker.check().await);
        assert_eq!(checker.tracker.last(), Some(LoginStatus::Authenticated));
    }
}
