//! Graph run results

use crate::error::Error;
use crate::stream::RunStats;
use std::collections::BTreeMap;

/// A root stream whose run failed
#[derive(Debug)]
pub struct StreamFailure {
    /// Root stream that was running
    pub stream: String,
    /// What went wrong, attributed to the innermost failing stream
    pub error: Error,
}

/// Outcome of a whole graph run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Counters per stream; child counters add up over all contexts
    pub streams: BTreeMap<String, RunStats>,
    /// Failed root runs, in run order
    pub failures: Vec<StreamFailure>,
    /// Root streams that completed
    pub completed: Vec<String>,
    /// The run stopped before every root was attempted
    pub aborted: bool,
}

impl RunSummary {
    /// Add the counters of one stream run
    pub fn record(&mut self, stream: &str, stats: RunStats) {
        self.streams.entry(stream.to_string()).or_default().absorb(stats);
    }

    /// Counters of one stream
    pub fn stats(&self, stream: &str) -> RunStats {
        self.streams.get(stream).copied().unwrap_or_default()
    }

    /// Total records emitted across streams
    pub fn total_records(&self) -> u64 {
        self.streams.values().map(|s| s.records).sum()
    }

    /// Check if every attempted root completed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.aborted
    }

    /// First failure, if any
    pub fn first_failure(&self) -> Option<&StreamFailure> {
        self.failures.first()
    }
}
