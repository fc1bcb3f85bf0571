pub mod types;
pub mod traits;
pub mod config;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod normalizer;
pub mod filter;
pub mod dedup;
pub mod pipeline;
pub mod store;
pub mod notifier;
pub mod digest;
pub mod utils;

pub use types::*;
pub use traits::{Announcer, JobStore, RunSummary, SourceAdapter};
pub use config::{CompanyBoard, CompanyList, FeedSpec, KeywordConfig};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use sources::{
    AshbySource, GreenhouseSource, LeverSource, RemoteOkSource, RssFeedSource, TheMuseSource, WorkableSource,
};
pub use normalizer::{InvalidReason, InvalidRecord, Normalizer};
pub use filter::{FilterOutcome, FilterStats, RejectReason, RelevanceFilter};
pub use dedup::{DedupKey, DedupStats, Deduplicator};
pub use pipeline::{
    announcer_for_store, IngestionPipeline, PipelineBuilder, PipelineRun, PublishReport, RunStats, SourceFailure,
};
pub use store::{MemoryJobStore, PgJobStore};
pub use notifier::DiscordNotifier;
