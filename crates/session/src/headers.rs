use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_LENGTH,
    CONTENT_TYPE, COOKIE, ORIGIN, REFERER, USER_AGENT,
};

// Stable browser fingerprint captured from the portal's own frontend.
// Host and Accept-Encoding are deliberately absent: the client sets them
// itself, and a hand-set Accept-Encoding would disable automatic gzip
// decompression.
const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const ACCEPT_LANGUAGE_VALUE: &str = "zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7,en-GB;q=0.6";
const USER_AGENT_VALUE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36 Edg/140.0.0.0";
const REFERER_VALUE: &str = "http://jwxt.gdufe.edu.cn/jsxsd/";
const ORIGIN_VALUE: &str = "http://jwxt.gdufe.edu.cn";

/// Build the full header set for one portal request. Pure and
/// deterministic: the same inputs always produce the same map.
///
/// POST requests get the form content type and `Origin`, plus
/// `Content-Length` when the body size is known. A non-empty cookie list is
/// serialized as `k1=v1; k2=v2` in insertion order.
pub fn build_headers(
    cookies: &[(String, String)],
    is_post: bool,
    content_length: Option<usize>,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(REFERER, HeaderValue::from_static(REFERER_VALUE));
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

    if is_post {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(ORIGIN, HeaderValue::from_static(ORIGIN_VALUE));
        if let Some(len) = content_length {
            if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
                headers.insert(CONTENT_LENGTH, value);
            }
        }
    }

    if !cookies.is_empty() {
        let cookie_str = cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ");
        if let Ok(value) = HeaderValue::from_str(&cookie_str) {
            headers.insert(COOKIE, value);
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookies(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_cookie_header_joins_in_insertion_order() {
        let headers = build_headers(
            &cookies(&[("JSESSIONID", "X"), ("SERVERID", "node2"), ("a", "1")]),
            false,
            None,
        );
        assert_eq!(
            headers.get(COOKIE).unwrap(),
            "JSESSIONID=X; SERVERID=node2; a=1"
        );
    }

    #[test]
    fn test_empty_cookies_omit_the_header() {
        let headers = build_headers(&[], false, None);
        assert!(headers.get(COOKIE).is_none());
    }

    #[test]
    fn test_get_never_carries_post_headers() {
        let headers = build_headers(&cookies(&[("JSESSIONID", "X")]), false, Some(59));
        assert!(headers.get(CONTENT_TYPE).is_none());
        assert!(headers.get(CONTENT_LENGTH).is_none());
        assert!(headers.get(ORIGIN).is_none());
    }

    #[test]
    fn test_post_headers_are_merged() {
        let headers = build_headers(&[], true, Some(42));
        assert_eq!(
            headers.get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(headers.get(CONTENT_LENGTH).unwrap(), "42");
        assert_eq!(headers.get(ORIGIN).unwrap(), ORIGIN_VALUE);
    }

    #[test]
    fn test_post_without_known_length_omits_content_length() {
        let headers = build_headers(&[], true, None);
        assert!(headers.get(CONTENT_LENGTH).is_none());
        assert!(headers.get(CONTENT_TYPE).is_some());
    }
}
