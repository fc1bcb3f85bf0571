use crate::types::{AggregatorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

fn default_include_weight() -> i64 {
    1
}

fn default_minimum_score() -> i64 {
    1
}

/// Keyword document driving the relevance filter.
///
/// ```yaml
/// include_keywords: ["UI/UX", "product design", "user experience"]
/// exclude_keywords: ["senior", "staff", "full-time"]
/// require_any: ["intern", "internship", "co-op"]
/// include_weight: 1
/// weights: { "UI/UX": 3 }
/// minimum_score: 1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordConfig {
    pub include_keywords: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    /// When non-empty, a record must mention at least one of these phrases.
    #[serde(default)]
    pub require_any: Vec<String>,
    #[serde(default = "default_include_weight")]
    pub include_weight: i64,
    /// Per-phrase overrides of `include_weight`.
    #[serde(default)]
    pub weights: BTreeMap<String, i64>,
    #[serde(default = "default_minimum_score")]
    pub minimum_score: i64,
}

impl KeywordConfig {
    pub fn new(include_keywords: Vec<String>, exclude_keywords: Vec<String>) -> Result<Self> {
        Self {
            include_keywords,
            exclude_keywords,
            require_any: Vec::new(),
            include_weight: default_include_weight(),
            weights: BTreeMap::new(),
            minimum_score: default_minimum_score(),
        }
        .validate()
    }

    pub fn with_require_any(mut self, phrases: Vec<String>) -> Result<Self> {
        self.require_any = phrases;
        self.validate()
    }

    pub fn from_yaml_str(document: &str) -> Result<Self> {
        let config: KeywordConfig = serde_yaml::from_str(document)
            .map_err(|e| AggregatorError::Config(format!("malformed keyword configuration: {}", e)))?;
        config.validate()
    }

    /// Load and validate the keyword document. A missing or malformed file is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let document = std::fs::read_to_string(path).map_err(|e| {
            AggregatorError::Config(format!("cannot read keyword configuration {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&document)?;

        info!(
            "Loaded keyword configuration from {} ({} include, {} exclude, min score {})",
            path.display(),
            config.include_keywords.len(),
            config.exclude_keywords.len(),
            config.minimum_score
        );
        Ok(config)
    }

    /// Trim and de-duplicate phrases, then check the document can actually filter.
    pub fn validate(mut self) -> Result<Self> {
        self.include_keywords = dedup_phrases(self.include_keywords);
        self.exclude_keywords = dedup_phrases(self.exclude_keywords);
        self.require_any = dedup_phrases(self.require_any);

        if self.include_keywords.is_empty() {
            return Err(AggregatorError::Config(
                "include_keywords must contain at least one phrase".to_string(),
            ));
        }
        if self.include_weight < 1 {
            return Err(AggregatorError::Config(format!(
                "include_weight must be positive, got {}",
                self.include_weight
            )));
        }
        if let Some((phrase, weight)) = self.weights.iter().find(|(_, weight)| **weight < 1) {
            return Err(AggregatorError::Config(format!(
                "weight for '{}' must be positive, got {}",
                phrase, weight
            )));
        }
        if self.minimum_score < 1 {
            return Err(AggregatorError::Config(format!(
                "minimum_score must be at least 1, got {}",
                self.minimum_score
            )));
        }

        for phrase in self.weights.keys() {
            if !self.include_keywords.iter().any(|p| p.eq_ignore_ascii_case(phrase)) {
                warn!("Weight configured for '{}' which is not an include keyword", phrase);
            }
        }

        Ok(self)
    }

    pub fn weight_for(&self, phrase: &str) -> i64 {
        self.weights
            .iter()
            .find(|(configured, _)| configured.eq_ignore_ascii_case(phrase))
            .map(|(_, weight)| *weight)
            .unwrap_or(self.include_weight)
    }
}

fn dedup_phrases(phrases: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    phrases
        .into_iter()
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .filter(|p| seen.insert(p.to_lowercase()))
        .collect()
}

/// A company and its handles on the ATS boards we know how to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyBoard {
    pub name: String,
    #[serde(default)]
    pub greenhouse: Option<String>,
    #[serde(default)]
    pub lever: Option<String>,
    #[serde(default)]
    pub ashby: Option<String>,
    #[serde(default)]
    pub workable: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyList {
    #[serde(default)]
    pub companies: Vec<CompanyBoard>,
}

impl CompanyList {
    pub fn from_yaml_str(document: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(document)?)
    }

    /// A missing company list only disables the board adapters.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(document) => {
                let list = Self::from_yaml_str(&document)?;
                info!("Loaded {} companies to track from {}", list.companies.len(), path.display());
                Ok(list)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Companies file not found: {}", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// A named RSS/Atom job feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
}

impl FeedSpec {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// Public remote-job feeds polled when no other list is given.
pub fn default_feeds() -> Vec<FeedSpec> {
    vec![
        FeedSpec::new("We Work Remotely", "https://weworkremotely.com/remote-jobs.rss"),
        FeedSpec::new("Remotive", "https://remotive.com/remote-jobs/rss-feed"),
        FeedSpec::new("Himalayas", "https://himalayas.app/jobs/rss"),
        FeedSpec::new("Jobicy", "https://jobicy.com/jobs-rss-feed.php"),
    ]
}
