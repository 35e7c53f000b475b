use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;
use url::Url;

use xuanke_core::config::SessionConfig;
use xuanke_core::{CredentialStore, ExtraHeaders, PortalError, PortalResponse, PortalTransport};

use crate::headers::build_headers;

/// Production transport: one reqwest client with a fixed short timeout,
/// redirects followed. Cookies come from the shared credential store on
/// every request, so a re-login is picked up without rebuilding anything.
pub struct HttpTransport {
    client: reqwest::Client,
    credentials: Arc<CredentialStore>,
}

impl HttpTransport {
    pub fn new(
        config: &SessionConfig,
        credentials: Arc<CredentialStore>,
    ) -> Result<Self, PortalError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| PortalError::Config(e.to_string()))?;

        Ok(Self {
            client,
            credentials,
        })
    }

    fn headers_for(
        &self,
        is_post: bool,
        content_length: Option<usize>,
        extra: ExtraHeaders<'_>,
    ) -> HeaderMap {
        let cookies = self.credentials.cookies();
        let mut headers = build_headers(&cookies, is_post, content_length);
        for (name, value) in extra {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }
        headers
    }

    async fn run(
        &self,
        url: &Url,
        request: reqwest::RequestBuilder,
    ) -> Result<PortalResponse, PortalError> {
        let start = Instant::now();
        debug!(url = %url, "portal request");

        let resp = request
            .send()
            .await
            .map_err(|e| PortalError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let final_url = Url::parse(resp.url().as_str()).unwrap_or_else(|_| url.clone());

        let mut headers = HashMap::new();
        for (k, v) in resp.headers() {
            if let Ok(val) = v.to_str() {
                headers.insert(k.as_str().to_string(), val.to_string());
            }
        }
        let content_type = headers.get("content-type").cloned();

        let body = resp
            .bytes()
            .await
            .map_err(|e| PortalError::Network(e.to_string()))?;

        Ok(PortalResponse {
            url: url.clone(),
            final_url,
            status,
            headers,
            body: body.to_vec(),
            content_type,
            fetched_at: chrono::Utc::now(),
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl PortalTransport for HttpTransport {
    async fn get(&self, url: &Url, extra: ExtraHeaders<'_>) -> Result<PortalResponse, PortalError> {
        let headers = self.headers_for(false, None, extra);
        self.run(url, self.client.get(url.as_str()).headers(headers))
            .await
    }

    async fn post_form(
        &self,
        url: &Url,
        body: String,
        extra: ExtraHeaders<'_>,
    ) -> Result<PortalResponse, PortalError> {
        // Content-Length is computed from the serialized body, not assumed.
        let headers = self.headers_for(true, Some(body.len()), extra);
        self.run(url, self.client.post(url.as_str()).headers(headers).body(body))
            .await
    }

    async fn head(&self, url: &Url) -> Result<PortalResponse, PortalError> {
        let headers = self.headers_for(false, None, &[]);
        self.run(url, self.client.head(url.as_str()).headers(headers))
            .await
    }
}
