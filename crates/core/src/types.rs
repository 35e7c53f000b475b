use async_trait::async_trait;
use std::collections::HashMap;
use url::Url;

use crate::error::PortalError;

/// Extra header name/value pairs merged on top of the generated defaults.
pub type ExtraHeaders<'a> = &'a [(&'a str, &'a str)];

/// HTTP seam to the portal. Every outbound request goes through an
/// implementation of this trait, which in turn attaches headers built from
/// the shared credential set.
#[async_trait]
pub trait PortalTransport: Send + Sync + 'static {
    async fn get(&self, url: &Url, extra: ExtraHeaders<'_>) -> Result<PortalResponse, PortalError>;

    /// POST an already-serialized `application/x-www-form-urlencoded` body.
    async fn post_form(
        &self,
        url: &Url,
        body: String,
        extra: ExtraHeaders<'_>,
    ) -> Result<PortalResponse, PortalError>;

    /// Metadata-only probe; the response body is expected to be empty.
    async fn head(&self, url: &Url) -> Result<PortalResponse, PortalError>;
}

#[derive(Debug, Clone)]
pub struct PortalResponse {
    pub url: Url,
    pub final_url: Url,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub response_time_ms: u64,
}

impl PortalResponse {
    /// Decode the body using the charset declared in Content-Type.
    /// The portal answers in GBK for anonymous sessions and UTF-8 once
    /// authenticated, so a fixed decoding would garble one of the two.
    pub fn text(&self) -> String {
        if let Some(ct) = &self.content_type {
            if let Some(label) = charset_label(ct) {
                if let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes()) {
                    let (decoded, _, _) = encoding.decode(&self.body);
                    return decoded.into_owned();
                }
            }
        }
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("charset="))
        .map(|label| label.trim_matches('"').to_string())
        .next()
}

/// Invoked after a successful re-login to re-establish registration-round
/// context. Failures are the caller's to log and swallow.
#[async_trait]
pub trait ReentryHook: Send + Sync + 'static {
    async fn on_login(&self) -> Result<(), PortalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with(content_type: &str, body: Vec<u8>) -> PortalResponse {
        let url = Url::parse("http://jwxt.gdufe.edu.cn/jsxsd/").unwrap();
        PortalResponse {
            url: url.clone(),
            final_url: url,
            status: 200,
            headers: HashMap::new(),
            body,
            content_type: Some(content_type.to_string()),
            fetched_at: chrono::Utc::now(),
            response_time_ms: 1,
        }
    }

    #[test]
    fn test_charset_label_extraction() {
        assert_eq!(
            charset_label("text/html;charset=utf-8").as_deref(),
            Some("utf-8")
        );
        assert_eq!(
            charset_label("text/html; charset=GBK").as_deref(),
            Some("GBK")
        );
        assert_eq!(charset_label("text/html"), None);
    }

    #[test]
    fn test_text_decodes_gbk_body() {
        // "验证码错误" in GBK
        let gbk = vec![0xd1, 0xe9, 0xd6, 0xa4, 0xc2, 0xeb, 0xb4, 0xed, 0xce, 0xf3];
        let resp = response_with("text/html;charset=GBK", gbk);
        assert_eq!(resp.text(), "验证码错误");
    }

    #[test]
    fn test_text_defaults_to_utf8() {
        let resp = response_with("text/html", "欢迎".as_bytes().to_vec());
        assert_eq!(resp.text(), "欢迎");
    }
}
