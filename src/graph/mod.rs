//! Stream graph
//!
//! Composes parent and child resource streams into one run.
//!
//! # Overview
//!
//! Roots run one after the other in catalog order. For every record a parent
//! emits, the parent's context mapping yields a [`RequestContext`] and each
//! child runs once, to completion, with that context before the parent moves
//! on to its next record. All requests share one [`HttpClient`], so the whole
//! run goes through a single rate limiter.
//!
//! A root's bookmark is committed, and a STATE message emitted, only once the
//! root and every child run below it have finished. A failing root does not
//! stop its siblings, except for the daily-limit hard stop, which ends the
//! whole run.

mod types;

pub use types::{RunSummary, StreamFailure};

use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::output::{Message, RecordSink};
use crate::state::StateManager;
use crate::stream::{ResourceStream, StreamDefinition};
use crate::types::RequestContext;
use crate::watermark::ReplicationWatermark;
use futures::future::{BoxFuture, FutureExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Parent/child composition of resource streams
#[derive(Debug)]
pub struct StreamGraph {
    /// Streams in catalog order
    streams: Vec<ResourceStream>,
    /// Child indices per stream index
    children: Vec<Vec<usize>>,
    /// Streams whose records are emitted
    selected: BTreeSet<String>,
    /// Bookmarks in and out
    state: StateManager,
    /// Configured watermark start
    start_date: Option<String>,
}

impl StreamGraph {
    /// Build a graph over the given definitions, all selected
    ///
    /// Names must be unique and a parent must be declared before its
    /// children, with a context mapping for them.
    pub fn new(
        definitions: Vec<StreamDefinition>,
        client: HttpClient,
        state: StateManager,
    ) -> Result<Self> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut children = vec![Vec::new(); definitions.len()];

        for (i, definition) in definitions.iter().enumerate() {
            if index.insert(definition.name.clone(), i).is_some() {
                return Err(Error::config(format!(
                    "Stream '{}' is declared twice",
                    definition.name
                )));
            }

            if let Some(parent) = &definition.parent {
                let &p = index.get(parent).ok_or_else(|| {
                    Error::config(format!(
                        "Parent '{parent}' of stream '{}' must be declared before it",
                        definition.name
                    ))
                })?;
                if definitions[p].child_context.is_none() {
                    return Err(Error::config(format!(
                        "Parent '{parent}' of stream '{}' derives no child context",
                        definition.name
                    )));
                }
                children[p].push(i);
            }
        }

        let selected = definitions.iter().map(|d| d.name.clone()).collect();
        let streams = definitions
            .into_iter()
            .map(|d| ResourceStream::new(Arc::new(d), client.clone()))
            .collect();

        Ok(Self {
            streams,
            children,
            selected,
            state,
            start_date: None,
        })
    }

    /// Set the configured watermark start
    #[must_use]
    pub fn with_start_date(mut self, start_date: Option<String>) -> Self {
        self.start_date = start_date;
        self
    }

    /// Restrict emitted records to the named streams
    ///
    /// An empty selection keeps every stream. Parents of selected streams
    /// still run, without emitting, to drive their children.
    pub fn select<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self);
        }

        let mut selected = BTreeSet::new();
        for name in names {
            let name = name.as_ref().trim();
            if self.position(name).is_none() {
                return Err(Error::StreamNotFound {
                    stream: name.to_string(),
                });
            }
            selected.insert(name.to_string());
        }
        self.selected = selected;
        Ok(self)
    }

    /// Stream names, in catalog order
    pub fn stream_names(&self) -> Vec<&str> {
        self.streams.iter().map(ResourceStream::name).collect()
    }

    /// Check if a stream's records are emitted
    pub fn is_selected(&self, stream: &str) -> bool {
        self.selected.contains(stream)
    }

    /// Root streams, in catalog order
    pub fn roots(&self) -> Vec<&str> {
        self.streams
            .iter()
            .filter(|s| s.definition().parent.is_none())
            .map(ResourceStream::name)
            .collect()
    }

    /// Children of a stream
    pub fn children(&self, stream: &str) -> Vec<&str> {
        self.position(stream)
            .map(|i| self.children[i].iter().map(|&c| self.streams[c].name()).collect())
            .unwrap_or_default()
    }

    /// The state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    fn position(&self, stream: &str) -> Option<usize> {
        self.streams.iter().position(|s| s.name() == stream)
    }

    /// A stream runs if it or any descendant is selected
    fn needs_run(&self, i: usize) -> bool {
        self.selected.contains(self.streams[i].name())
            || self.children[i].iter().any(|&c| self.needs_run(c))
    }

    // ========================================================================
    // Run
    // ========================================================================

    /// Run every needed root and its children into `sink`
    ///
    /// Stream failures are reported in the summary. Only failures of the sink
    /// or of state persistence are returned as errors.
    pub async fn run<S: RecordSink + ?Sized>(&self, sink: &mut S) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for stream in self.streams.iter().filter(|s| self.is_selected(s.name())) {
            let definition = stream.definition();
            sink.emit(Message::schema(
                &definition.name,
                definition.schema.to_json(),
                definition.primary_keys.clone(),
                definition.replication_key.as_deref(),
            ))
            .await?;
        }

        let roots: Vec<usize> = (0..self.streams.len())
            .filter(|&i| self.streams[i].definition().parent.is_none() && self.needs_run(i))
            .collect();

        for root in roots {
            let name = self.streams[root].name();
            match self.run_root(root, sink, &mut summary).await {
                Ok(()) => summary.completed.push(name.to_string()),
                Err(e) if e.is_fatal_for_process() => {
                    error!("{name} failed, stopping the run: {e}");
                    summary.failures.push(StreamFailure {
                        stream: name.to_string(),
                        error: e,
                    });
                    summary.aborted = true;
                    break;
                }
                Err(e) => {
                    error!("{name} failed ({}): {e}", e.reason());
                    summary.failures.push(StreamFailure {
                        stream: name.to_string(),
                        error: e,
                    });
                }
            }
        }

        sink.emit(Message::state(self.state.snapshot().await)).await?;
        sink.flush().await?;

        if !summary.is_success() {
            warn!(
                "Run finished with {} failed stream(s){}",
                summary.failures.len(),
                if summary.aborted { ", aborted" } else { "" }
            );
        }
        Ok(summary)
    }

    /// Run one root, then commit its bookmark
    async fn run_root<S: RecordSink + ?Sized>(
        &self,
        root: usize,
        sink: &mut S,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let stream = &self.streams[root];
        let definition = stream.definition();
        let name = stream.name();
        let started = Instant::now();

        let bookmark = match &definition.replication_key {
            Some(_) => self.state.get_bookmark(name).await,
            None => None,
        };
        let watermark = ReplicationWatermark::new(self.start_date.as_deref(), bookmark.as_deref())
            .map_err(|e| e.in_stream(name))?;

        info!("Starting {name}");
        let watermark = self.run_stream(root, None, watermark, sink, summary).await?;

        let stats = summary.stats(name);
        info!(
            "Finished {name}: {} records in {} pages, {} skipped, {:.1}s",
            stats.records,
            stats.pages,
            stats.skipped,
            started.elapsed().as_secs_f64()
        );
        for &child in &self.children[root] {
            let child_name = self.streams[child].name();
            let child_stats = summary.stats(child_name);
            info!(
                "Finished {child_name}: {} records in {} pages",
                child_stats.records, child_stats.pages
            );
        }

        if let (Some(key), Some(mark)) = (&definition.replication_key, watermark.high_water_mark()) {
            if self.is_selected(name) {
                self.state.set_bookmark(name, key, mark.as_str()).await?;
                sink.emit(Message::state(self.state.snapshot().await)).await?;
            }
        }
        Ok(())
    }

    /// Run one stream and, per emitted record, its needed children
    ///
    /// Returns the watermark carrying the run's high-water mark. Any failure,
    /// including one in a child run, ends this run.
    fn run_stream<'a, S: RecordSink + ?Sized>(
        &'a self,
        i: usize,
        context: Option<&'a RequestContext>,
        watermark: ReplicationWatermark,
        sink: &'a mut S,
        summary: &'a mut RunSummary,
    ) -> BoxFuture<'a, Result<ReplicationWatermark>> {
        async move {
            let stream = &self.streams[i];
            let definition = stream.definition();
            let name = stream.name();
            let selected = self.is_selected(name);
            let children: Vec<usize> = self.children[i]
                .iter()
                .copied()
                .filter(|&c| self.needs_run(c))
                .collect();

            let mut run = stream.start(context, watermark).map_err(|e| e.in_stream(name))?;

            let outcome: Result<()> = async {
                while let Some(records) = run.next_page().await.map_err(|e| e.in_stream(name))? {
                    for record in records {
                        let child_context = if children.is_empty() {
                            None
                        } else {
                            definition.child_context(&record).map_err(|e| e.in_stream(name))?
                        };

                        if selected {
                            sink.emit(Message::record(name, record)).await?;
                        }

                        let Some(ctx) = child_context else {
                            continue;
                        };
                        for &child in &children {
                            let child_watermark = self.child_watermark(child)?;
                            debug!("Running {} for {ctx}", self.streams[child].name());
                            self.run_stream(
                                child,
                                Some(&ctx),
                                child_watermark,
                                &mut *sink,
                                &mut *summary,
                            )
                            .await?;
                        }
                    }
                }
                Ok(())
            }
            .await;

            // pages already emitted count even when the run fails later
            summary.record(name, run.stats());
            outcome?;
            Ok(run.into_watermark())
        }
        .boxed()
    }

    /// Child runs are bounded by the configured start only; they keep no bookmark
    fn child_watermark(&self, child: usize) -> Result<ReplicationWatermark> {
        let stream = &self.streams[child];
        if stream.definition().replication_key.is_none() {
            return Ok(ReplicationWatermark::default());
        }
        ReplicationWatermark::new(self.start_date.as_deref(), None)
            .map_err(|e| e.in_stream(stream.name()))
    }
}

#[cfg(test)]
mod tests;
