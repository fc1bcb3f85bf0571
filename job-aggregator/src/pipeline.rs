use crate::config::KeywordConfig;
use crate::dedup::{DedupStats, Deduplicator};
use crate::filter::{FilterStats, RelevanceFilter};
use crate::normalizer::Normalizer;
use crate::traits::{Announcer, JobStore, SourceAdapter};
use crate::types::{AggregatorError, JobRecord, RawRecord, Result, UpsertOutcome};
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(60);

/// A source that produced nothing usable this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source_id: String,
    pub source_name: String,
    pub error: String,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub fetched: usize,
    pub sources_ok: usize,
    pub source_failures: Vec<SourceFailure>,
    pub invalid: usize,
    pub filter: FilterStats,
    pub dedup: DedupStats,
    pub output: usize,
}

/// Ranked batch produced by one run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub scraped_date: NaiveDate,
    pub jobs: Vec<JobRecord>,
    pub stats: RunStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub inserted: usize,
    pub updated: usize,
    pub url_conflicts: usize,
    pub store_errors: usize,
    pub announced: usize,
    pub already_announced: usize,
    pub announce_errors: usize,
}

/// Runs every source, then normalize, filter and dedup over the combined batch
pub struct IngestionPipeline {
    sources: Vec<Box<dyn SourceAdapter>>,
    filter: RelevanceFilter,
    deduplicator: Deduplicator,
    source_timeout: Duration,
    today: Option<NaiveDate>,
}

impl IngestionPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    fn scraped_date(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Poll every source concurrently, each under its own timeout.
    ///
    /// Records come back grouped by source in registration order, so the
    /// batch is deterministic regardless of which source answered first.
    pub async fn collect_sources(&self) -> (Vec<(String, RawRecord)>, Vec<SourceFailure>) {
        let fetches = self.sources.iter().map(|source| async move {
            let started = Instant::now();
            let outcome = tokio::time::timeout(self.source_timeout, source.fetch()).await;
            (source, outcome, started.elapsed())
        });

        let mut batch = Vec::new();
        let mut failures = Vec::new();

        for (source, outcome, elapsed) in join_all(fetches).await {
            let source_id = source.source_id();
            match outcome {
                Ok(Ok(records)) => {
                    info!(
                        "Source {} returned {} records in {}ms",
                        source.source_name(),
                        records.len(),
                        elapsed.as_millis()
                    );
                    batch.extend(records.into_iter().map(|raw| (source_id.clone(), raw)));
                }
                Ok(Err(e)) => {
                    error!("Source {} failed: {}", source.source_name(), e);
                    failures.push(SourceFailure {
                        source_id,
                        source_name: source.source_name(),
                        error: e.to_string(),
                        timed_out: false,
                    });
                }
                Err(_) => {
                    error!(
                        "Source {} timed out after {:?}",
                        source.source_name(),
                        self.source_timeout
                    );
                    failures.push(SourceFailure {
                        source_id,
                        source_name: source.source_name(),
                        error: format!("timed out after {:?}", self.source_timeout),
                        timed_out: true,
                    });
                }
            }
        }

        (batch, failures)
    }

    /// Normalize, filter, dedup and rank an already collected batch
    pub fn process(&self, batch: Vec<(String, RawRecord)>, scraped_date: NaiveDate) -> PipelineRun {
        let fetched = batch.len();

        let normalizer = Normalizer::new(scraped_date);
        let (records, invalid) = normalizer.normalize_all(&batch);
        let (relevant, filter_stats) = self.filter.apply(records);
        let (mut jobs, dedup_stats) = self.deduplicator.deduplicate(relevant);

        // Stable, so equal keys keep their dedup order
        jobs.sort_by_key(|job| (Reverse(job.relevance_score), Reverse(job.scraped_date)));

        PipelineRun {
            scraped_date,
            stats: RunStats {
                fetched,
                invalid: invalid.len(),
                filter: filter_stats,
                dedup: dedup_stats,
                output: jobs.len(),
                ..Default::default()
            },
            jobs,
        }
    }

    /// One full batch run. Source failures are recorded, never propagated.
    pub async fn run(&self) -> PipelineRun {
        let scraped_date = self.scraped_date();
        info!("Starting run for {} with {} sources", scraped_date, self.sources.len());

        let (batch, failures) = self.collect_sources().await;
        let mut run = self.process(batch, scraped_date);
        run.stats.sources_ok = self.sources.len() - failures.len();
        run.stats.source_failures = failures;

        info!(
            "Run finished: {} fetched, {} invalid, {} relevant, {} after dedup, {}/{} sources ok",
            run.stats.fetched,
            run.stats.invalid,
            run.stats.filter.accepted,
            run.stats.output,
            run.stats.sources_ok,
            self.sources.len()
        );
        run
    }

    /// Hand a run to storage and announce what storage has not seen under
    /// another id. Each (job, channel) pair is announced at most once.
    pub async fn publish(
        &self,
        run: &PipelineRun,
        store: &dyn JobStore,
        announcer: Option<&dyn Announcer>,
        channels: &[String],
        max_announcements: Option<usize>,
    ) -> PublishReport {
        let mut report = PublishReport::default();
        let mut sent_per_channel: HashMap<&str, usize> = HashMap::new();

        for job in &run.jobs {
            match store.upsert_job(job).await {
                Ok(UpsertOutcome::Inserted) => report.inserted += 1,
                Ok(UpsertOutcome::Updated) => report.updated += 1,
                Ok(UpsertOutcome::UrlConflict) => {
                    debug!("Skipping {}: url already stored under another id", job.id);
                    report.url_conflicts += 1;
                    continue;
                }
                Err(e) => {
                    error!("Failed to store {}: {}", job.id, e);
                    report.store_errors += 1;
                    continue;
                }
            }

            let Some(announcer) = announcer else {
                continue;
            };

            for channel in channels {
                let sent = sent_per_channel.entry(channel.as_str()).or_insert(0);
                if max_announcements.is_some_and(|max| *sent >= max) {
                    continue;
                }

                match store.is_announced(&job.id, channel).await {
                    Ok(true) => {
                        report.already_announced += 1;
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        error!("Failed to check announcement of {} on {}: {}", job.id, channel, e);
                        report.store_errors += 1;
                        continue;
                    }
                }

                match announcer.announce(job, channel).await {
                    Ok(()) => {
                        *sent += 1;
                        report.announced += 1;
                        if let Err(e) = store.record_announcement(&job.id, channel).await {
                            error!("Announced {} on {} but failed to record it: {}", job.id, channel, e);
                            report.store_errors += 1;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to announce {} on {}: {}", job.id, channel, e);
                        report.announce_errors += 1;
                    }
                }
            }
        }

        info!(
            "Published {} jobs: {} new, {} updated, {} url conflicts, {} announced",
            run.jobs.len(),
            report.inserted,
            report.updated,
            report.url_conflicts,
            report.announced
        );
        report
    }
}

/// The announcer to publish through, or `None` when `store` cannot remember
/// announcements past this run
pub fn announcer_for_store<'a>(
    store: &dyn JobStore,
    announcer: Option<&'a dyn Announcer>,
) -> Option<&'a dyn Announcer> {
    match announcer {
        Some(_) if !store.is_durable() => {
            warn!("Job store does not outlive this run; announcements disabled");
            None
        }
        other => other,
    }
}

pub struct PipelineBuilder {
    sources: Vec<Box<dyn SourceAdapter>>,
    keywords: Option<KeywordConfig>,
    source_timeout: Duration,
    today: Option<NaiveDate>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            keywords: None,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            today: None,
        }
    }

    pub fn add_source(mut self, source: Box<dyn SourceAdapter>) -> Self {
        info!("Adding source to pipeline: {}", source.source_name());
        self.sources.push(source);
        self
    }

    pub fn keywords(mut self, keywords: KeywordConfig) -> Self {
        self.keywords = Some(keywords);
        self
    }

    pub fn source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Pin the scrape date instead of using the current UTC day
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn build(self) -> Result<IngestionPipeline> {
        let keywords = self
            .keywords
            .ok_or_else(|| AggregatorError::Config("pipeline needs a keyword configuration".to_string()))?;
        let keywords = keywords.validate()?;

        Ok(IngestionPipeline {
            sources: self.sources,
            filter: RelevanceFilter::new(keywords),
            deduplicator: Deduplicator::new(),
            source_timeout: self.source_timeout,
            today: self.today,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
