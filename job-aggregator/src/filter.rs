use crate::config::KeywordConfig;
use crate::types::{JobRecord, ScoreBreakdown};
use crate::utils::text::collapse_whitespace;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Why a record was dropped by the relevance filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// An exclude phrase matched; no amount of include score saves it.
    Excluded { phrase: String },
    MissingRequired,
    NoIncludeMatch,
    BelowThreshold { score: i64, minimum: i64 },
}

impl RejectReason {
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::Excluded { .. } => "excluded",
            RejectReason::MissingRequired => "missing_required",
            RejectReason::NoIncludeMatch => "no_include_match",
            RejectReason::BelowThreshold { .. } => "below_threshold",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Excluded { phrase } => write!(f, "matched exclude phrase '{}'", phrase),
            RejectReason::MissingRequired => f.write_str("mentions none of the required phrases"),
            RejectReason::NoIncludeMatch => f.write_str("matched no include phrase"),
            RejectReason::BelowThreshold { score, minimum } => {
                write!(f, "score {} below minimum {}", score, minimum)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    Accepted(JobRecord),
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub accepted: usize,
    /// Rejection counts keyed by `RejectReason::label`
    pub rejected: BTreeMap<&'static str, usize>,
}

impl FilterStats {
    pub fn total_rejected(&self) -> usize {
        self.rejected.values().sum()
    }

    pub fn rejected_for(&self, label: &str) -> usize {
        self.rejected.get(label).copied().unwrap_or(0)
    }
}

/// A configured phrase alongside the form it is matched in
#[derive(Debug, Clone)]
struct Phrase {
    original: String,
    needle: String,
}

impl Phrase {
    fn compile(phrases: &[String]) -> Vec<Phrase> {
        phrases
            .iter()
            .map(|original| Phrase {
                original: original.clone(),
                needle: collapse_whitespace(original).to_lowercase(),
            })
            .filter(|phrase| !phrase.needle.is_empty())
            .collect()
    }
}

/// Scores and gates normalized records against the keyword configuration
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    config: KeywordConfig,
    include: Vec<Phrase>,
    exclude: Vec<Phrase>,
    require_any: Vec<Phrase>,
}

impl RelevanceFilter {
    pub fn new(config: KeywordConfig) -> Self {
        Self {
            include: Phrase::compile(&config.include_keywords),
            exclude: Phrase::compile(&config.exclude_keywords),
            require_any: Phrase::compile(&config.require_any),
            config,
        }
    }

    /// Decide a single record. Accepted records come back with their score
    /// and breakdown filled in.
    pub fn evaluate(&self, mut record: JobRecord) -> FilterOutcome {
        let haystack = searchable_text(&record);

        if let Some(phrase) = self.exclude.iter().find(|p| contains_phrase(&haystack, &p.needle)) {
            return FilterOutcome::Rejected(RejectReason::Excluded {
                phrase: phrase.original.clone(),
            });
        }

        if !self.require_any.is_empty()
            && !self.require_any.iter().any(|p| contains_phrase(&haystack, &p.needle))
        {
            return FilterOutcome::Rejected(RejectReason::MissingRequired);
        }

        let breakdown: ScoreBreakdown = self
            .include
            .iter()
            .filter(|p| contains_phrase(&haystack, &p.needle))
            .map(|p| (p.original.clone(), self.config.weight_for(&p.original)))
            .collect();

        if breakdown.is_empty() {
            return FilterOutcome::Rejected(RejectReason::NoIncludeMatch);
        }

        let score = breakdown.total();
        if score < self.config.minimum_score {
            return FilterOutcome::Rejected(RejectReason::BelowThreshold {
                score,
                minimum: self.config.minimum_score,
            });
        }

        record.set_score(breakdown);
        FilterOutcome::Accepted(record)
    }

    /// Run a batch through the filter, keeping input order among the accepted
    pub fn apply(&self, records: Vec<JobRecord>) -> (Vec<JobRecord>, FilterStats) {
        let total = records.len();
        let mut stats = FilterStats::default();
        let mut accepted = Vec::new();

        for record in records {
            let id = record.id.clone();
            match self.evaluate(record) {
                FilterOutcome::Accepted(record) => {
                    stats.accepted += 1;
                    accepted.push(record);
                }
                FilterOutcome::Rejected(reason) => {
                    debug!("Rejected {}: {}", id, reason);
                    *stats.rejected.entry(reason.label()).or_insert(0) += 1;
                }
            }
        }

        info!(
            "Relevance filter kept {} of {} records ({} rejected)",
            stats.accepted,
            total,
            stats.total_rejected()
        );
        (accepted, stats)
    }
}

fn searchable_text(record: &JobRecord) -> String {
    let description = record.description.as_deref().unwrap_or("");
    collapse_whitespace(&format!("{} {}", record.title, description)).to_lowercase()
}

/// Case-folded phrase search that refuses to match inside a longer word:
/// "intern" does not match "internal", while "ui/ux" matches "ui/ux-focused".
/// Both sides are expected to be lowercased already.
pub fn contains_phrase(haystack: &str, needle: &str) -> bool {
    let (Some(first), Some(last)) = (needle.chars().next(), needle.chars().next_back()) else {
        return false;
    };
    let needs_left_boundary = first.is_alphanumeric();
    let needs_right_boundary = last.is_alphanumeric();

    let mut start = 0;
    while let Some(offset) = haystack[start..].find(needle) {
        let begin = start + offset;
        let end = begin + needle.len();

        let left_ok = !needs_left_boundary
            || haystack[..begin].chars().next_back().map_or(true, |c| !c.is_alphanumeric());
        let right_ok = !needs_right_boundary
            || haystack[end..].chars().next().map_or(true, |c| !c.is_alphanumeric());
        if left_ok && right_ok {
            return true;
        }

        start = begin + first.len_utf8();
    }
    false
}
