use crate::types::{
    AshbyJob, GreenhouseJob, JobRecord, JobSource, LeverPosting, MuseJob, RawRecord, RemoteOkJob, RssEntry,
    ScoreBreakdown, WorkableJob,
};
use crate::utils::{html, text};
use chrono::{DateTime, Days, Months, NaiveDate};
use std::fmt;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// Query parameters that only carry attribution and never identify a job.
/// Anything starting with `utm_` is dropped as well.
const TRACKING_PARAMS: &[&str] = &[
    "gclid",
    "fbclid",
    "msclkid",
    "mc_cid",
    "mc_eid",
    "_hsenc",
    "_hsmi",
    "gh_src",
    "lever-source",
    "lever-origin",
    "trk",
    "trackingid",
    "refid",
    "ref",
];

/// Phrases that mean "posted on the scrape date".
const SAME_DAY_PHRASES: &[&str] = &["today", "posted today", "just posted", "just now", "new"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelativeUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

/// Every unit spelling accepted in "<n><unit> ago".
const RELATIVE_UNITS: &[(&str, RelativeUnit)] = &[
    ("m", RelativeUnit::Minutes),
    ("min", RelativeUnit::Minutes),
    ("mins", RelativeUnit::Minutes),
    ("minute", RelativeUnit::Minutes),
    ("minutes", RelativeUnit::Minutes),
    ("h", RelativeUnit::Hours),
    ("hr", RelativeUnit::Hours),
    ("hrs", RelativeUnit::Hours),
    ("hour", RelativeUnit::Hours),
    ("hours", RelativeUnit::Hours),
    ("d", RelativeUnit::Days),
    ("day", RelativeUnit::Days),
    ("days", RelativeUnit::Days),
    ("w", RelativeUnit::Weeks),
    ("wk", RelativeUnit::Weeks),
    ("wks", RelativeUnit::Weeks),
    ("week", RelativeUnit::Weeks),
    ("weeks", RelativeUnit::Weeks),
    ("mo", RelativeUnit::Months),
    ("mos", RelativeUnit::Months),
    ("month", RelativeUnit::Months),
    ("months", RelativeUnit::Months),
    ("y", RelativeUnit::Years),
    ("yr", RelativeUnit::Years),
    ("yrs", RelativeUnit::Years),
    ("year", RelativeUnit::Years),
    ("years", RelativeUnit::Years),
];

const ABSOLUTE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%b %d, %Y", "%B %d, %Y", "%d %b %Y", "%d %B %Y"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    MissingTitle,
    MissingCompany,
    MissingUrl,
    MalformedUrl(String),
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::MissingTitle => f.write_str("missing title"),
            InvalidReason::MissingCompany => f.write_str("missing company"),
            InvalidReason::MissingUrl => f.write_str("missing url"),
            InvalidReason::MalformedUrl(detail) => write!(f, "malformed url: {}", detail),
        }
    }
}

/// A raw record that could not be turned into a `JobRecord`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid record from {source_id}: {reason}")]
pub struct InvalidRecord {
    pub source_id: String,
    pub reason: InvalidReason,
}

/// Source-independent view of a raw record, before validation.
#[derive(Debug, Default)]
struct ExtractedFields {
    native_id: Option<String>,
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    url: Option<String>,
    description: Option<String>,
    posted_date: Option<NaiveDate>,
    salary: Option<String>,
}

/// Collapses every source-specific shape into the canonical `JobRecord`.
#[derive(Debug, Clone)]
pub struct Normalizer {
    scraped_date: NaiveDate,
}

impl Normalizer {
    pub fn new(scraped_date: NaiveDate) -> Self {
        Self { scraped_date }
    }

    pub fn normalize(&self, source_id: &str, raw: &RawRecord) -> Result<JobRecord, InvalidRecord> {
        let invalid = |reason: InvalidReason| InvalidRecord {
            source_id: source_id.to_string(),
            reason,
        };

        let fields = match raw {
            RawRecord::Greenhouse(job) => self.extract_greenhouse(job),
            RawRecord::Lever(posting) => self.extract_lever(posting),
            RawRecord::Ashby(job) => self.extract_ashby(job),
            RawRecord::Workable(job) => self.extract_workable(job),
            RawRecord::RemoteOk(job) => self.extract_remoteok(job),
            RawRecord::Rss(entry) => self.extract_rss(entry),
            RawRecord::TheMuse(job) => self.extract_themuse(job),
        };

        let title = text::clean_optional(fields.title.as_deref()).ok_or_else(|| invalid(InvalidReason::MissingTitle))?;
        let company =
            text::clean_optional(fields.company.as_deref()).ok_or_else(|| invalid(InvalidReason::MissingCompany))?;
        let url = normalize_url(fields.url.as_deref().unwrap_or("")).map_err(invalid)?;

        let location = text::clean_optional(fields.location.as_deref()).unwrap_or_else(|| match raw.source() {
            JobSource::Greenhouse | JobSource::Lever => "Unspecified".to_string(),
            _ => "Remote".to_string(),
        });

        let native_id = fields
            .native_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        let id = match native_id {
            Some(native_id) => format!("{}_{}", source_id, native_id),
            None => format!("{}_{}", source_id, stable_hash(&url)),
        };

        Ok(JobRecord {
            id,
            title,
            company,
            location,
            url,
            description: text::clean_optional(fields.description.as_deref()),
            posted_date: fields.posted_date,
            scraped_date: self.scraped_date,
            source: raw.source(),
            salary: text::clean_optional(fields.salary.as_deref()),
            relevance_score: 0,
            score_breakdown: ScoreBreakdown::new(),
        })
    }

    /// Normalize a whole batch, keeping the invalid records for counting.
    pub fn normalize_all(&self, batch: &[(String, RawRecord)]) -> (Vec<JobRecord>, Vec<InvalidRecord>) {
        let mut records = Vec::with_capacity(batch.len());
        let mut invalid = Vec::new();

        for (source_id, raw) in batch {
            match self.normalize(source_id, raw) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!("Dropping record: {}", e);
                    invalid.push(e);
                }
            }
        }

        info!("Normalized {} records ({} invalid)", records.len(), invalid.len());
        (records, invalid)
    }

    fn extract_greenhouse(&self, job: &GreenhouseJob) -> ExtractedFields {
        let posted = job.first_published.as_deref().or(job.updated_at.as_deref());

        ExtractedFields {
            native_id: job.id.map(|id| id.to_string()),
            title: job.title.clone(),
            company: Some(job.company_name.clone()),
            location: job.location.as_ref().and_then(|l| l.name.clone()),
            url: job.absolute_url.clone(),
            // Greenhouse serves its markup entity-escaped
            description: job
                .content
                .as_deref()
                .map(|content| html::to_plain_text(&html::unescape_markup(content))),
            posted_date: posted.and_then(|p| parse_posted_date(p, self.scraped_date)),
            salary: None,
        }
    }

    fn extract_lever(&self, posting: &LeverPosting) -> ExtractedFields {
        let plain_parts: Vec<&str> = [posting.description_plain.as_deref(), posting.additional_plain.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect();
        let description = if plain_parts.is_empty() {
            posting.description.as_deref().map(html::to_plain_text)
        } else {
            Some(plain_parts.join("\n\n"))
        };

        let salary = posting.salary_range.as_ref().and_then(|range| {
            let amount = format_salary_range(range.min, range.max)?;
            match range.currency.as_deref() {
                Some(currency) if !currency.eq_ignore_ascii_case("USD") => Some(format!("{} {}", amount, currency)),
                _ => Some(amount),
            }
        });

        ExtractedFields {
            native_id: posting.id.clone(),
            title: posting.text.clone(),
            company: Some(posting.company_name.clone()),
            location: posting.categories.as_ref().and_then(|c| c.location.clone()),
            url: posting.hosted_url.clone().or_else(|| posting.apply_url.clone()),
            description,
            posted_date: posting.created_at.and_then(date_from_epoch_millis),
            salary,
        }
    }

    fn extract_ashby(&self, job: &AshbyJob) -> ExtractedFields {
        let location = job
            .location
            .as_ref()
            .and_then(|l| l.name())
            .map(str::to_string)
            .or_else(|| job.is_remote.filter(|remote| *remote).map(|_| "Remote".to_string()));

        let description = job
            .description_plain
            .clone()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| job.description_html.as_deref().map(html::to_plain_text));

        ExtractedFields {
            native_id: job.id.clone(),
            title: job.title.clone(),
            company: Some(job.company_name.clone()),
            location,
            url: job.job_url.clone().or_else(|| job.apply_url.clone()),
            description,
            posted_date: job
                .published_at
                .as_deref()
                .and_then(|p| parse_posted_date(p, self.scraped_date)),
            salary: None,
        }
    }

    fn extract_workable(&self, job: &WorkableJob) -> ExtractedFields {
        let city = text::clean_optional(job.city.as_deref());
        let country = text::clean_optional(job.country.as_deref());
        let location = match (city, country) {
            (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
            (Some(only), None) | (None, Some(only)) => Some(only),
            (None, None) if job.telecommuting == Some(true) => Some("Remote".to_string()),
            (None, None) => None,
        };

        let posted = job.published_on.as_deref().or(job.created_at.as_deref());

        ExtractedFields {
            native_id: job.shortcode.clone(),
            title: job.title.clone(),
            company: Some(job.company_name.clone()),
            location,
            url: job.url.clone().or_else(|| job.application_url.clone()),
            description: job.description.as_deref().map(html::to_plain_text),
            posted_date: posted.and_then(|p| parse_posted_date(p, self.scraped_date)),
            salary: None,
        }
    }

    fn extract_themuse(&self, job: &MuseJob) -> ExtractedFields {
        let locations: Vec<&str> = job
            .locations
            .iter()
            .filter_map(|l| l.name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .collect();

        ExtractedFields {
            native_id: job.id.map(|id| id.to_string()),
            title: job.name.clone(),
            company: job.company.as_ref().and_then(|c| c.name.clone()),
            location: if locations.is_empty() { None } else { Some(locations.join(", ")) },
            url: job.refs.as_ref().and_then(|r| r.landing_page.clone()),
            description: job.contents.as_deref().map(html::to_plain_text),
            posted_date: job
                .publication_date
                .as_deref()
                .and_then(|p| parse_posted_date(p, self.scraped_date)),
            salary: None,
        }
    }

    fn extract_remoteok(&self, job: &RemoteOkJob) -> ExtractedFields {
        let native_id = job
            .id
            .as_ref()
            .and_then(|id| match id {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .or_else(|| job.slug.clone());

        // RemoteOK reports a missing location as the string "false"
        let location = job
            .location
            .clone()
            .filter(|l| !l.trim().is_empty() && l.trim() != "false");

        let url = job
            .url
            .clone()
            .or_else(|| job.apply_url.clone())
            .or_else(|| job.slug.as_ref().map(|slug| format!("https://remoteok.com/remote-jobs/{}", slug)));

        let posted_date = job
            .epoch
            .and_then(date_from_epoch_seconds)
            .or_else(|| job.date.as_deref().and_then(|d| parse_posted_date(d, self.scraped_date)));

        ExtractedFields {
            native_id,
            title: job.position.clone(),
            company: job.company.clone(),
            location,
            url,
            description: job.description.as_deref().map(html::to_plain_text),
            posted_date,
            salary: format_salary_range(job.salary_min, job.salary_max),
        }
    }

    fn extract_rss(&self, entry: &RssEntry) -> ExtractedFields {
        let raw_title = entry.title.as_deref().unwrap_or("");
        let (title, company) = split_rss_title(raw_title, entry.author.as_deref(), &entry.categories);
        let description = entry.summary.as_deref().map(html::to_plain_text);

        let mentions_remote = raw_title.to_lowercase().contains("remote")
            || description
                .as_deref()
                .map(|d| d.chars().take(200).collect::<String>().to_lowercase().contains("remote"))
                .unwrap_or(false);

        ExtractedFields {
            // Feed guids are frequently the link itself; the url hash is steadier
            native_id: None,
            title: Some(title),
            company,
            location: if mentions_remote { Some("Remote".to_string()) } else { None },
            url: entry.link.clone(),
            description,
            posted_date: entry.published.map(|p| p.date_naive()),
            salary: None,
        }
    }
}

/// Canonical form of an apply link: lower-cased host, no fragment, no
/// attribution parameters. Path and remaining query parameters are kept.
pub fn normalize_url(raw: &str) -> Result<String, InvalidReason> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InvalidReason::MissingUrl);
    }

    let mut url = Url::parse(trimmed).map_err(|e| InvalidReason::MalformedUrl(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(InvalidReason::MalformedUrl(format!("unsupported scheme {}", url.scheme())));
    }

    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            url.set_host(Some(&lowered))
                .map_err(|e| InvalidReason::MalformedUrl(e.to_string()))?;
        }
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept.iter());
        }
    }

    Ok(url.to_string())
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

fn stable_hash(normalized_url: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, normalized_url.as_bytes())
        .simple()
        .to_string()
}

/// Parse a relative ("2w ago", "Today") or absolute posted date.
///
/// Returns `None` for anything not recognised; no date is ever guessed.
pub fn parse_posted_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let phrase = text::collapse_whitespace(raw).to_lowercase();
    if phrase.is_empty() {
        return None;
    }

    parse_relative_date(&phrase, today).or_else(|| parse_absolute_date(raw.trim()))
}

fn parse_relative_date(phrase: &str, today: NaiveDate) -> Option<NaiveDate> {
    if SAME_DAY_PHRASES.contains(&phrase) {
        return Some(today);
    }
    if phrase == "yesterday" {
        return today.checked_sub_days(Days::new(1));
    }

    let phrase = phrase.strip_prefix("posted ").unwrap_or(phrase);
    let body = phrase.strip_suffix(" ago")?;
    let digits_end = body.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }

    let amount: u64 = body[..digits_end].parse().ok()?;
    let unit_text = body[digits_end..].trim_start_matches('+').trim();
    let unit = RELATIVE_UNITS
        .iter()
        .find(|(spelling, _)| *spelling == unit_text)
        .map(|(_, unit)| *unit)?;

    match unit {
        RelativeUnit::Minutes => today.checked_sub_days(Days::new(amount / (24 * 60))),
        RelativeUnit::Hours => today.checked_sub_days(Days::new(amount / 24)),
        RelativeUnit::Days => today.checked_sub_days(Days::new(amount)),
        RelativeUnit::Weeks => today.checked_sub_days(Days::new(amount.checked_mul(7)?)),
        RelativeUnit::Months => today.checked_sub_months(Months::new(u32::try_from(amount).ok()?)),
        RelativeUnit::Years => today.checked_sub_months(Months::new(u32::try_from(amount.checked_mul(12)?).ok()?)),
    }
}

fn parse_absolute_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.date_naive());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.date_naive());
    }

    for format in ABSOLUTE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    // Offset-less ISO timestamps such as "2025-11-05T12:00:00"
    if raw.len() > 10 && raw.is_char_boundary(10) {
        return NaiveDate::parse_from_str(&raw[..10], "%Y-%m-%d").ok();
    }

    None
}

fn date_from_epoch_seconds(seconds: i64) -> Option<NaiveDate> {
    if seconds <= 0 {
        return None;
    }
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.date_naive())
}

fn date_from_epoch_millis(millis: i64) -> Option<NaiveDate> {
    if millis <= 0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}

/// Render a min/max pair as "$20 - $30/hr" or "$80,000/yr".
pub fn format_salary_range(min: Option<f64>, max: Option<f64>) -> Option<String> {
    let min = min.filter(|v| v.is_finite() && *v > 0.0);
    let max = max.filter(|v| v.is_finite() && *v > 0.0);

    let amounts = match (min, max) {
        (Some(low), Some(high)) if (low - high).abs() < f64::EPSILON => vec![low],
        (Some(low), Some(high)) => vec![low, high],
        (Some(only), None) | (None, Some(only)) => vec![only],
        (None, None) => return None,
    };

    let top = max.or(min)?;
    let period = if top > 1000.0 { "/yr" } else { "/hr" };
    let range = amounts.iter().map(|v| format_dollars(*v)).collect::<Vec<_>>().join(" - ");

    Some(format!("{}{}", range, period))
}

fn format_dollars(amount: f64) -> String {
    let whole = amount.round() as i64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("${}", grouped)
}

/// Title prefixes that are never a company in "Company - Title".
const NOT_A_COMPANY: &[&str] = &["remote", "design", "engineer"];

/// Split a feed title into (title, company).
///
/// Author wins when present; otherwise "Company: Title", "Title at Company"
/// and "Company - Title" are recognised, and the first category that names
/// a company comes last.
fn split_rss_title(raw_title: &str, author: Option<&str>, categories: &[String]) -> (String, Option<String>) {
    let title = text::collapse_whitespace(raw_title);

    if let Some(author) = author.map(text::collapse_whitespace) {
        if !author.is_empty() && author.chars().count() < 100 {
            return (title, Some(author));
        }
    }

    if let Some((company, rest)) = title.split_once(':') {
        let company = company.trim();
        let rest = rest.trim();
        if !company.is_empty() && !rest.is_empty() && company.chars().count() < 50 {
            return (rest.to_string(), Some(company.to_string()));
        }
    }

    if let Some(idx) = title.rfind(" at ") {
        let company = title[idx + 4..].trim();
        let role = title[..idx].trim();
        if !company.is_empty() && !role.is_empty() && company.chars().count() < 50 {
            return (role.to_string(), Some(company.to_string()));
        }
    }

    if let Some((company, rest)) = title.split_once(" - ") {
        let company = company.trim();
        let rest = rest.trim();
        let lowered = company.to_lowercase();
        if !company.is_empty()
            && !rest.is_empty()
            && company.chars().count() < 50
            && !NOT_A_COMPANY.iter().any(|word| lowered.contains(word))
        {
            return (rest.to_string(), Some(company.to_string()));
        }
    }

    let category = categories
        .iter()
        .map(|c| text::collapse_whitespace(c))
        .find(|c| !c.is_empty() && !c.to_lowercase().contains("company"));

    (title, category)
}
