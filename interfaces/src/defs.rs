use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Origin adapter of a job listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobSource {
    Greenhouse,
    Lever,
    Ashby,
    Workable,
    #[serde(rename = "RemoteOK")]
    RemoteOk,
    #[serde(rename = "RSS")]
    Rss,
    TheMuse,
}

impl JobSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSource::Greenhouse => "Greenhouse",
            JobSource::Lever => "Lever",
            JobSource::Ashby => "Ashby",
            JobSource::Workable => "Workable",
            JobSource::RemoteOk => "RemoteOK",
            JobSource::Rss => "RSS",
            JobSource::TheMuse => "TheMuse",
        }
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-rule contributions to a relevance score.
///
/// The total is always derived from the entries, so a record's score can
/// never drift from its breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreBreakdown(BTreeMap<String, i64>);

impl ScoreBreakdown {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn add(&mut self, rule: impl Into<String>, contribution: i64) {
        *self.0.entry(rule.into()).or_insert(0) += contribution;
    }

    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }

    pub fn get(&self, rule: &str) -> Option<i64> {
        self.0.get(rule).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(rule, value)| (rule.as_str(), *value))
    }

    pub fn as_map(&self) -> &BTreeMap<String, i64> {
        &self.0
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for ScoreBreakdown {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        let mut breakdown = ScoreBreakdown::new();
        for (rule, contribution) in iter {
            breakdown.add(rule, contribution);
        }
        breakdown
    }
}

/// Canonical job listing shared by every stage after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub description: Option<String>,
    pub posted_date: Option<NaiveDate>,
    pub scraped_date: NaiveDate,
    pub source: JobSource,
    pub salary: Option<String>,
    pub relevance_score: i64,
    pub score_breakdown: ScoreBreakdown,
}

impl JobRecord {
    /// Replace the score annotation; the score is recomputed from the breakdown.
    pub fn set_score(&mut self, breakdown: ScoreBreakdown) {
        self.relevance_score = breakdown.total();
        self.score_breakdown = breakdown;
    }

    pub fn has_salary(&self) -> bool {
        self.salary.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    pub fn has_description(&self) -> bool {
        self.description.as_deref().is_some_and(|d| !d.trim().is_empty())
    }

    /// Posted date as shown to people; absent dates are "Unknown".
    pub fn posted_label(&self) -> String {
        self.posted_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Result of handing one record to the persistence layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Another id already owns this url; the record is treated as already known.
    UrlConflict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_jobs: i64,
    pub jobs_posted_today: i64,
    pub jobs_scraped_today: i64,
    pub total_announcements: i64,
}
