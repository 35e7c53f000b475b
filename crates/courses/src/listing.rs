use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use xuanke_core::config::CoursesConfig;
use xuanke_core::{PortalError, PortalTransport};

/// The portal's DataTables endpoints always page by 15.
pub const PAGE_SIZE: usize = 15;

/// The three selectable-course catalogs the portal exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    /// 公共选修课
    PublicElective,
    /// 专业选修课
    MajorElective,
    /// 学科基础、专业必修课
    MajorRequired,
}

impl Catalog {
    pub const ALL: [Catalog; 3] = [
        Catalog::PublicElective,
        Catalog::MajorElective,
        Catalog::MajorRequired,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Catalog::PublicElective => "公共选修课",
            Catalog::MajorElective => "专业选修课",
            Catalog::MajorRequired => "学科基础专业必修课",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            Catalog::PublicElective => {
                "xsxkkc/xsxkGgxxkxk?kcxx=&skls=&skxq=&skjc=&sfym=false&sfct=false&szjylb=&xq=&szkclb="
            }
            Catalog::MajorElective => "xsxkkc/xsxkXxxk",
            Catalog::MajorRequired => "xsxkkc/xsxkBxxk",
        }
    }

    fn referer_path(&self) -> &'static str {
        match self {
            Catalog::PublicElective => "xsxk/xsxkGgxxkxk",
            Catalog::MajorElective => "xsxkkc/comeInXxxk",
            Catalog::MajorRequired => "xsxkkc/comeInBxxk",
        }
    }

    /// Column descriptors the DataTables endpoint expects; the public
    /// elective catalog carries one extra category column.
    fn data_props(&self) -> Vec<&'static str> {
        let mut props = vec![
            "kch", "kcmc", "xf", "skls", "xqid", "sksj", "skdd", "xxrs", "xkrs", "czrs", "syrs",
            "bj", "ctsm",
        ];
        if *self == Catalog::PublicElective {
            props.push("szkcflmc");
        }
        props.push("czOper");
        props
    }
}

/// One course offering, keeping the portal's own field names on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Course {
    /// Selection id submitted when registering.
    #[serde(default, rename = "jx0404id", deserialize_with = "stringish")]
    pub selection_id: String,
    #[serde(default, rename = "kch", deserialize_with = "stringish")]
    pub course_code: String,
    #[serde(default, rename = "kcmc", deserialize_with = "stringish")]
    pub name: String,
    #[serde(default, rename = "xf", deserialize_with = "stringish")]
    pub credits: String,
    #[serde(default, rename = "skls", deserialize_with = "stringish")]
    pub teacher: String,
    #[serde(default, rename = "sksj", deserialize_with = "stringish")]
    pub schedule: String,
    #[serde(default, rename = "skdd", deserialize_with = "stringish")]
    pub location: String,
    /// Remaining seats; the portal sends numbers, strings, and sometimes
    /// nothing at all.
    #[serde(default, rename = "syrs", deserialize_with = "stringish")]
    pub remaining: String,
    /// Timetable-conflict note; empty means no conflict.
    #[serde(default, rename = "ctsm", deserialize_with = "stringish")]
    pub conflict: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListingPage {
    #[serde(default, rename = "aaData")]
    rows: Vec<Course>,
    #[serde(default, rename = "iTotalRecords")]
    total_records: usize,
}

/// Fetch one catalog completely: page 1 reveals the record count, the rest
/// of the pages are fetched concurrently with a small stagger. A failed
/// page contributes nothing rather than aborting the whole listing.
pub async fn fetch_catalog(
    transport: Arc<dyn PortalTransport>,
    base: &Url,
    catalog: Catalog,
    config: &CoursesConfig,
) -> Result<Vec<Course>, PortalError> {
    let first = fetch_page(&transport, base, catalog, 1).await?;
    let total_pages = first.total_records.div_ceil(PAGE_SIZE);
    let mut courses = first.rows;
    debug!(
        catalog = catalog.label(),
        total_records = first.total_records,
        total_pages,
        "first listing page fetched"
    );

    if total_pages > 1 {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_pages.max(1)));
        let stagger = std::time::Duration::from_millis(config.page_stagger_ms);

        let mut handles = Vec::with_capacity(total_pages - 1);
        for page in 2..=total_pages {
            let transport = transport.clone();
            let base = base.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                match fetch_page(&transport, &base, catalog, page).await {
                    Ok(listing) => listing.rows,
                    Err(e) => {
                        warn!(catalog = catalog.label(), page, error = %e, "listing page failed");
                        Vec::new()
                    }
                }
            }));
            // Keep page requests from landing on the portal all at once.
            tokio::time::sleep(stagger).await;
        }

        for handle in handles {
            courses.extend(handle.await.unwrap_or_default());
        }
    }

    info!(
        catalog = catalog.label(),
        total = courses.len(),
        "listing fetch complete"
    );
    Ok(courses)
}

async fn fetch_page(
    transport: &Arc<dyn PortalTransport>,
    base: &Url,
    catalog: Catalog,
    page: usize,
) -> Result<ListingPage, PortalError> {
    let url = base
        .join(catalog.path())
        .map_err(|e| PortalError::InvalidUrl(e.to_string()))?;
    let referer = base
        .join(catalog.referer_path())
        .map_err(|e| PortalError::InvalidUrl(e.to_string()))?;

    let body = form_body(catalog, page);
    let resp = transport
        .post_form(
            &url,
            body,
            &[
                ("X-Requested-With", "XMLHttpRequest"),
                ("Referer", referer.as_str()),
                ("Accept", "*/*"),
            ],
        )
        .await?;

    if resp.status != 200 {
        return Err(PortalError::Network(format!(
            "listing page {} answered {}",
            page, resp.status
        )));
    }

    serde_json::from_str(&resp.text())
        .map_err(|e| PortalError::Parse(format!("listing page {}: {}", page, e)))
}

/// DataTables form body for one page; `sEcho` echoes the page number and
/// `iDisplayStart` is the zero-based row offset.
fn form_body(catalog: Catalog, page: usize) -> String {
    let props = catalog.data_props();
    let mut pairs: Vec<(String, String)> = vec![
        ("iColumns".into(), props.len().to_string()),
        ("sColumns".into(), String::new()),
        ("iDisplayLength".into(), PAGE_SIZE.to_string()),
    ];
    for (i, prop) in props.iter().enumerate() {
        pairs.push((format!("mDataProp_{}", i), prop.to_string()));
    }
    pairs.push(("sEcho".into(), page.to_string()));
    pairs.push((
        "iDisplayStart".into(),
        ((page - 1) * PAGE_SIZE).to_string(),
    ));

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Accept strings, numbers, and null where the portal is inconsistent.
fn stringish<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
