use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub portal: PortalConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub captcha: CaptchaConfig,
    #[serde(default)]
    pub courses: CoursesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Initial session cookies; serialization order on the wire is the
    /// order they appear here.
    #[serde(default, deserialize_with = "cookie_pairs")]
    pub cookies: Vec<(String, String)>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaptchaConfig {
    #[serde(default = "default_captcha_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub debug_dump: bool,
    #[serde(default = "default_dump_dir")]
    pub dump_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CoursesConfig {
    #[serde(default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: usize,
    #[serde(default = "default_page_stagger_ms")]
    pub page_stagger_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: default_check_interval(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_captcha_attempts(),
            debug_dump: false,
            dump_dir: default_dump_dir(),
        }
    }
}

impl Default for CoursesConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pages: default_max_concurrent_pages(),
            page_stagger_ms: default_page_stagger_ms(),
        }
    }
}

fn default_check_interval() -> u64 { 60 }
fn default_request_timeout() -> u64 { 10 }
fn default_captcha_attempts() -> u32 { 2 }
fn default_dump_dir() -> String { "./tmp".to_string() }
fn default_max_concurrent_pages() -> usize { 8 }
fn default_page_stagger_ms() -> u64 { 100 }

/// Deserialize a TOML table into name/value pairs, keeping document order.
fn cookie_pairs<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PairVisitor;

    impl<'de> serde::de::Visitor<'de> for PairVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a map of cookie names to values")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::MapAccess<'de>,
        {
            let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(1));
            while let Some((name, value)) = access.next_entry::<String, String>()? {
                pairs.push((name, value));
            }
            Ok(pairs)
        }
    }

    deserializer.deserialize_map(PairVisitor)
}
