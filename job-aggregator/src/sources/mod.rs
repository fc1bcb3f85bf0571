pub mod ashby;
pub mod greenhouse;
pub mod lever;
pub mod remoteok;
pub mod rss_feed;
pub mod themuse;
pub mod workable;

pub use ashby::AshbySource;
pub use greenhouse::GreenhouseSource;
pub use lever::LeverSource;
pub use remoteok::RemoteOkSource;
pub use rss_feed::RssFeedSource;
pub use themuse::TheMuseSource;
pub use workable::WorkableSource;

use crate::types::{AggregatorError, RawRecord, Result};
use tracing::warn;

/// Outcome of polling one adapter across several boards or feeds.
///
/// A single bad board is only logged; the adapter fails when every one did.
#[derive(Debug, Default)]
pub(crate) struct BoardSweep {
    records: Vec<RawRecord>,
    attempted: usize,
    failures: Vec<String>,
}

impl BoardSweep {
    pub(crate) fn succeeded(&mut self, records: impl IntoIterator<Item = RawRecord>) {
        self.attempted += 1;
        self.records.extend(records);
    }

    pub(crate) fn failed(&mut self, source_id: &str, board: &str, error: &AggregatorError) {
        warn!("{}: failed to fetch {}: {}", source_id, board, error);
        self.attempted += 1;
        self.failures.push(format!("{}: {}", board, error));
    }

    pub(crate) fn finish(self, source_id: &str) -> Result<Vec<RawRecord>> {
        if self.attempted > 0 && self.failures.len() == self.attempted {
            return Err(AggregatorError::SourceFetch {
                source_id: source_id.to_string(),
                message: self.failures.join("; "),
            });
        }
        Ok(self.records)
    }
}
