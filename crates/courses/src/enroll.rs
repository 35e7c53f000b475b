use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use url::Url;

use xuanke_core::{PortalError, PortalTransport};

/// Result of one registration submission. `accepted` reflects the portal's
/// inner verdict, not just transport success; `message` carries whatever
/// the portal said (conflict notes, "course full", ...).
#[derive(Debug, Clone)]
pub struct EnrollOutcome {
    pub course_id: String,
    pub accepted: bool,
    pub message: String,
    pub raw: String,
}

#[derive(Debug, Default, Deserialize)]
struct EnrollReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: String,
}

/// Submit a registration request for one course offering.
pub async fn submit_registration(
    transport: &Arc<dyn PortalTransport>,
    base: &Url,
    course_id: &str,
) -> Result<EnrollOutcome, PortalError> {
    // cxxdlx=1 selects the ordinary registration flow; priority and paid
    // selection are left empty the way the portal's own page submits them.
    let url = base
        .join(&format!(
            "xsxkkc/ggxxkxkOper?jx0404id={}&xkzy=&trjf=&cxxdlx=1",
            course_id
        ))
        .map_err(|e| PortalError::InvalidUrl(e.to_string()))?;
    let referer = base
        .join("xsxkkc/comeInGgxxkxk")
        .map_err(|e| PortalError::InvalidUrl(e.to_string()))?;

    let resp = transport
        .get(
            &url,
            &[
                ("X-Requested-With", "XMLHttpRequest"),
                ("Referer", referer.as_str()),
            ],
        )
        .await?;

    if resp.status != 200 {
        return Ok(EnrollOutcome {
            course_id: course_id.to_string(),
            accepted: false,
            message: format!("http status {}", resp.status),
            raw: String::new(),
        });
    }

    let raw = resp.text();
    let outcome = parse_reply(course_id, &raw);
    info!(
        course_id,
        accepted = outcome.accepted,
        message = %outcome.message,
        "registration submitted"
    );
    Ok(outcome)
}

/// The portal answers with a small JSON document, sometimes wrapped in
/// whitespace. Unparseable answers are carried verbatim as the message.
fn parse_reply(course_id: &str, raw: &str) -> EnrollOutcome {
    match serde_json::from_str::<EnrollReply>(raw.trim()) {
        Ok(reply) => EnrollOutcome {
            course_id: course_id.to_string(),
            accepted: reply.success,
            message: reply.message,
            raw: raw.to_string(),
        },
        Err(_) => EnrollOutcome {
            course_id: course_id.to_string(),
            accepted: false,
            message: raw.trim().to_string(),
            raw: raw.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepted_reply() {
        let outcome = parse_reply("202520261007196", r#"{"success":true,"message":"选课成功"}"#);
        assert!(outcome.accepted);
        assert_eq!(outcome.message, "选课成功");
    }

    #[test]
    fn test_parse_rejected_reply_with_trailing_noise() {
        let raw = "{\"success\":false,\"message\":\"选课失败：与已选中课程‘体育养生 ’冲突\"}\r\n";
        let outcome = parse_reply("202520261007196", raw);
        assert!(!outcome.accepted);
        assert!(outcome.message.contains("冲突"));
        assert_eq!(outcome.raw, raw);
    }

    #[test]
    fn test_unparseable_reply_is_carried_verbatim() {
        let outcome = parse_reply("x", "<html>会话超时</html>");
        assert!(!outcome.accepted);
        assert_eq!(outcome.message, "<html>会话超时</html>");
    }
}
