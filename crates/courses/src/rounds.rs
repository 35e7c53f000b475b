use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{info, warn};
use url::Url;

use xuanke_core::{PortalError, PortalTransport, ReentryHook};

const ROUNDS_PATH: &str = "xsxk/xklc_list";
const ENTER_PATH: &str = "xsxk/xsxk_index";

/// One time-boxed registration window, as listed on the rounds page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRound {
    pub year_term: String,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    /// `jx0502zbid` — the opaque parameter that opens the selection
    /// subsystem for this round.
    pub round_id: String,
}

/// Fetch and parse the registration-round list.
pub async fn fetch_rounds(
    transport: &Arc<dyn PortalTransport>,
    base: &Url,
) -> Result<Vec<RegistrationRound>, PortalError> {
    let url = base
        .join(ROUNDS_PATH)
        .map_err(|e| PortalError::InvalidUrl(e.to_string()))?;
    let referer = base
        .join("xskb/xskb_list.do")
        .map_err(|e| PortalError::InvalidUrl(e.to_string()))?;

    let resp = transport
        .get(&url, &[("Referer", referer.as_str())])
        .await?;
    if resp.status != 200 {
        return Err(PortalError::Network(format!(
            "round list answered {}",
            resp.status
        )));
    }
    Ok(parse_rounds(&resp.text()))
}

/// Extract rounds from the `Nsb_r_list` table. Rows that do not look like
/// round rows are skipped rather than failing the whole page.
pub fn parse_rounds(html: &str) -> Vec<RegistrationRound> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table.Nsb_r_list").unwrap();
    let row_sel = Selector::parse("tr").unwrap();
    let cell_sel = Selector::parse("td").unwrap();
    let link_sel = Selector::parse("a").unwrap();
    let id_re = Regex::new(r"jx0502zbid=([^&'\x22]+)").unwrap();

    let Some(table) = document.select(&table_sel).next() else {
        warn!("round table not found in listing page");
        return Vec::new();
    };

    let mut rounds = Vec::new();
    for row in table.select(&row_sel).skip(1) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < 7 {
            continue;
        }

        let text = |i: usize| {
            cells[i]
                .text()
                .collect::<String>()
                .trim()
                .to_string()
        };

        let round_id = cells[6]
            .select(&link_sel)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| id_re.captures(href))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .next()
            .unwrap_or_default();

        rounds.push(RegistrationRound {
            year_term: text(0),
            name: text(1),
            start_time: text(4),
            end_time: text(5),
            round_id,
        });
    }
    rounds
}

/// Enter the selection subsystem for a round; without an explicit id the
/// first listed round is used. This is what re-establishes the selection
/// context after a re-login.
pub async fn enter_selection(
    transport: &Arc<dyn PortalTransport>,
    base: &Url,
    round_id: Option<&str>,
) -> Result<(), PortalError> {
    let round_id = match round_id {
        Some(id) => id.to_string(),
        None => {
            let rounds = fetch_rounds(transport, base).await?;
            let Some(first) = rounds.into_iter().find(|r| !r.round_id.is_empty()) else {
                return Err(PortalError::Parse("no registration round listed".into()));
            };
            first.round_id
        }
    };

    let url = base
        .join(&format!("{}?jx0502zbid={}", ENTER_PATH, round_id))
        .map_err(|e| PortalError::InvalidUrl(e.to_string()))?;
    let referer = base
        .join("xsxk/xklc_list?Ves632DSdyV=NEW_XSD_PYGL")
        .map_err(|e| PortalError::InvalidUrl(e.to_string()))?;

    let resp = transport
        .get(&url, &[("Referer", referer.as_str())])
        .await?;
    info!(
        round_id = %round_id,
        response_time_ms = resp.response_time_ms,
        "entered selection subsystem"
    );
    Ok(())
}

/// Production re-entry hook: after a re-login, step back into the current
/// registration round.
pub struct RoundEntryHook {
    transport: Arc<dyn PortalTransport>,
    base: Url,
}

impl RoundEntryHook {
    pub fn new(transport: Arc<dyn PortalTransport>, base: Url) -> Self {
        Self { transport, base }
    }
}

#[async_trait]
impl ReentryHook for RoundEntryHook {
    async fn on_login(&self) -> Result<(), PortalError> {
        enter_selection(&self.transport, &self.base, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html><body>
        <table class="Nsb_r_list">
          <tr><th>学年学期</th><th>轮次</th><th>a</th><th>b</th>
              <th>开始</th><th>结束</th><th>操作</th></tr>
          <tr>
            <td>2025-2026-1</td><td>第一轮选课</td><td>x</td><td>y</td>
            <td>2025-09-01 09:00</td><td>2025-09-03 17:00</td>
            <td><a href="/jsxsd/xsxk/xsxk_index?jx0502zbid=9B8C7D">进入选课</a></td>
          </tr>
          <tr>
            <td>2025-2026-1</td><td>第二轮选课</td><td>x</td><td>y</td>
            <td>2025-09-10 09:00</td><td>2025-09-12 17:00</td>
            <td>未开放</td>
          </tr>
          <tr><td>short row</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_rounds_extracts_fields() {
        let rounds = parse_rounds(SAMPLE);
        assert_eq!(rounds.len(), 2);

        assert_eq!(rounds[0].year_term, "2025-2026-1");
        assert_eq!(rounds[0].name, "第一轮选课");
        assert_eq!(rounds[0].start_time, "2025-09-01 09:00");
        assert_eq!(rounds[0].end_time, "2025-09-03 17:00");
        assert_eq!(rounds[0].round_id, "9B8C7D");

        // Second round has no entry link yet.
        assert_eq!(rounds[1].round_id, "");
    }

    #[test]
    fn test_parse_rounds_without_table_is_empty() {
        assert!(parse_rounds("<html><body><p>维护中</p></body></html>").is_empty());
    }
}
