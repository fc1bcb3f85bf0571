use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
// Use the interfaces crate for the canonical record types
pub use interfaces::defs::{JobRecord, JobSource, ScoreBreakdown, StoreStats, UpsertOutcome};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_response_size_mb: usize,
    pub max_redirects: usize,
    /// Minimum spacing between two requests to the same host.
    pub min_host_interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "UI-UX-Internship-Tracker/1.0".to_string(),
            timeout_seconds: 15,
            max_retries: 2,
            retry_delay_ms: 1_000,
            max_response_size_mb: 20,
            max_redirects: 5,
            min_host_interval_ms: 500,
        }
    }
}

/// Source-native listing, one variant per adapter.
///
/// Nothing outside the adapters and the normalizer looks inside these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record")]
pub enum RawRecord {
    Greenhouse(GreenhouseJob),
    Lever(LeverPosting),
    Ashby(AshbyJob),
    Workable(WorkableJob),
    RemoteOk(RemoteOkJob),
    Rss(RssEntry),
    TheMuse(MuseJob),
}

impl RawRecord {
    pub fn source(&self) -> JobSource {
        match self {
            RawRecord::Greenhouse(_) => JobSource::Greenhouse,
            RawRecord::Lever(_) => JobSource::Lever,
            RawRecord::Ashby(_) => JobSource::Ashby,
            RawRecord::Workable(_) => JobSource::Workable,
            RawRecord::RemoteOk(_) => JobSource::RemoteOk,
            RawRecord::Rss(_) => JobSource::Rss,
            RawRecord::TheMuse(_) => JobSource::TheMuse,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GreenhouseBoard {
    #[serde(default)]
    pub jobs: Vec<GreenhouseJob>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GreenhouseJob {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub absolute_url: Option<String>,
    /// HTML-escaped body, only present when requested with `content=true`.
    pub content: Option<String>,
    pub updated_at: Option<String>,
    pub first_published: Option<String>,
    pub location: Option<GreenhouseLocation>,
    /// Display name from the company list; not part of the API payload.
    #[serde(default)]
    pub company_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GreenhouseLocation {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeverPosting {
    pub id: Option<String>,
    pub text: Option<String>,
    pub hosted_url: Option<String>,
    pub apply_url: Option<String>,
    pub description_plain: Option<String>,
    pub description: Option<String>,
    pub additional_plain: Option<String>,
    /// Milliseconds since the epoch.
    pub created_at: Option<i64>,
    pub categories: Option<LeverCategories>,
    pub salary_range: Option<LeverSalaryRange>,
    #[serde(default)]
    pub company_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeverCategories {
    pub location: Option<String>,
    pub team: Option<String>,
    pub commitment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeverSalaryRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: Option<String>,
    pub interval: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AshbyBoard {
    #[serde(default)]
    pub jobs: Vec<AshbyJob>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AshbyJob {
    pub id: Option<String>,
    pub title: Option<String>,
    pub location: Option<AshbyLocation>,
    pub is_remote: Option<bool>,
    pub employment_type: Option<String>,
    pub job_url: Option<String>,
    pub apply_url: Option<String>,
    pub description_plain: Option<String>,
    pub description_html: Option<String>,
    #[serde(alias = "publishedDate")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub company_name: String,
}

/// Ashby boards send the location either as a bare name or as an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AshbyLocation {
    Name(String),
    Detailed { name: Option<String> },
}

impl AshbyLocation {
    pub fn name(&self) -> Option<&str> {
        match self {
            AshbyLocation::Name(name) => Some(name.as_str()),
            AshbyLocation::Detailed { name } => name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkableAccount {
    #[serde(default)]
    pub jobs: Vec<WorkableJob>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkableJob {
    pub shortcode: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub application_url: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub telecommuting: Option<bool>,
    pub description: Option<String>,
    pub published_on: Option<String>,
    pub created_at: Option<String>,
    #[serde(default)]
    pub company_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MusePage {
    pub page: Option<u32>,
    pub page_count: Option<u32>,
    #[serde(default)]
    pub results: Vec<MuseJob>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MuseJob {
    pub id: Option<u64>,
    pub name: Option<String>,
    /// HTML body
    pub contents: Option<String>,
    pub publication_date: Option<String>,
    #[serde(default)]
    pub locations: Vec<MuseNamed>,
    pub refs: Option<MuseRefs>,
    pub company: Option<MuseNamed>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MuseNamed {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MuseRefs {
    pub landing_page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteOkJob {
    /// RemoteOK sends ids as strings or numbers depending on the listing.
    pub id: Option<serde_json::Value>,
    pub slug: Option<String>,
    pub position: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub apply_url: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    /// Seconds since the epoch.
    pub epoch: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RssEntry {
    pub feed_name: String,
    pub guid: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Source {source_id} failed: {message}")]
    SourceFetch { source_id: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Announcement to channel {channel} failed: {message}")]
    Announce { channel: String, message: String },

    #[error("Response size exceeds limit: {size_mb}MB")]
    ResponseTooLarge { size_mb: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
