use crate::types::JobRecord;
use crate::utils::text::fold_for_comparison;
use chrono::NaiveDate;
use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, info};

/// Identity under which two records are considered the same listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Url(String),
    Content {
        company: String,
        title: String,
        location: String,
    },
}

impl DedupKey {
    /// Canonical url when there is one, content otherwise
    pub fn for_record(record: &JobRecord) -> Self {
        let url = record.url.trim();
        if url.is_empty() {
            Self::content(record)
        } else {
            DedupKey::Url(url.to_string())
        }
    }

    /// Folded (company, title, location), blind to case and punctuation
    pub fn content(record: &JobRecord) -> Self {
        DedupKey::Content {
            company: fold_for_comparison(&record.company),
            title: fold_for_comparison(&record.title),
            location: fold_for_comparison(&record.location),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub input: usize,
    pub output: usize,
    pub url_duplicates: usize,
    pub content_duplicates: usize,
    pub id_duplicates: usize,
}

impl DedupStats {
    pub fn removed(&self) -> usize {
        self.input - self.output
    }
}

/// Collapses the same listing seen through several sources into one record.
///
/// Records are grouped by url, then by content, then by id. Each group keeps
/// the most complete member and sits where the group was first seen.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator;

impl Deduplicator {
    pub fn new() -> Self {
        Self
    }

    pub fn deduplicate(&self, records: Vec<JobRecord>) -> (Vec<JobRecord>, DedupStats) {
        let mut stats = DedupStats {
            input: records.len(),
            ..Default::default()
        };

        let (records, merged) = collapse_by(records, DedupKey::for_record);
        stats.url_duplicates = merged;

        let (records, merged) = collapse_by(records, DedupKey::content);
        stats.content_duplicates = merged;

        // Ids derive from source-native ids, so two different urls can still
        // share one; the store keys on id and must never see it twice.
        let (records, merged) = collapse_by(records, |record| record.id.clone());
        stats.id_duplicates = merged;

        stats.output = records.len();
        info!(
            "Deduplicated {} records into {} ({} by url, {} by content, {} by id)",
            stats.input, stats.output, stats.url_duplicates, stats.content_duplicates, stats.id_duplicates
        );
        (records, stats)
    }
}

fn collapse_by<K, F>(records: Vec<JobRecord>, key_of: F) -> (Vec<JobRecord>, usize)
where
    K: Eq + Hash,
    F: Fn(&JobRecord) -> K,
{
    let mut kept: Vec<JobRecord> = Vec::with_capacity(records.len());
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut merged = 0;

    for record in records {
        match slots.entry(key_of(&record)) {
            Entry::Occupied(slot) => {
                merged += 1;
                let incumbent = &mut kept[*slot.get()];
                if completeness(&record) > completeness(incumbent) {
                    debug!("Keeping {} over duplicate {}", record.id, incumbent.id);
                    *incumbent = record;
                } else {
                    debug!("Dropping duplicate {} of {}", record.id, incumbent.id);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(kept.len());
                kept.push(record);
            }
        }
    }

    (kept, merged)
}

/// Salary beats description beats the earlier sighting. Ties keep the
/// record seen first.
fn completeness(record: &JobRecord) -> (bool, bool, Reverse<NaiveDate>) {
    (
        record.has_salary(),
        record.has_description(),
        Reverse(record.scraped_date),
    )
}
