//! Resource stream execution

use super::definition::StreamDefinition;
use super::filters::FilterDecision;
use crate::error::Result;
use crate::http::{HttpClient, RequestConfig};
use crate::pagination::{NextPage, PageToken};
use crate::template;
use crate::types::{field_as_string, Record, RequestContext};
use crate::watermark::ReplicationWatermark;
use std::sync::Arc;
use tracing::{debug, info};

/// Query parameter carrying the page token
const PAGE_PARAM: &str = "page";

/// Counters of one stream run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Pages fetched
    pub pages: u32,
    /// Records emitted
    pub records: u64,
    /// Records dropped by filters
    pub skipped: u64,
}

impl RunStats {
    /// Add another run's counters
    pub fn absorb(&mut self, other: RunStats) {
        self.pages += other.pages;
        self.records += other.records;
        self.skipped += other.skipped;
    }
}

/// Everything a completed run produced
#[derive(Debug)]
pub struct RunOutput {
    /// Emitted records, in order
    pub records: Vec<Record>,
    /// Watermark after the run, carrying the high-water mark
    pub watermark: ReplicationWatermark,
    /// Run counters
    pub stats: RunStats,
}

// ============================================================================
// Resource Stream
// ============================================================================

/// One resource endpoint bound to a client
#[derive(Debug, Clone)]
pub struct ResourceStream {
    definition: Arc<StreamDefinition>,
    client: HttpClient,
}

impl ResourceStream {
    /// Bind a definition to a client
    pub fn new(definition: Arc<StreamDefinition>, client: HttpClient) -> Self {
        Self { definition, client }
    }

    /// The stream definition
    pub fn definition(&self) -> &StreamDefinition {
        &self.definition
    }

    /// Stream name
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Begin a run, optionally bound to a parent-derived context
    ///
    /// Fails when the context does not define every placeholder of the path.
    pub fn start(
        &self,
        context: Option<&RequestContext>,
        watermark: ReplicationWatermark,
    ) -> Result<StreamRun<'_>> {
        let empty = RequestContext::new();
        let path = template::render(&self.definition.path, context.unwrap_or(&empty))?;

        match context {
            Some(ctx) => debug!("Starting {} for {ctx}", self.name()),
            None => debug!("Starting {}", self.name()),
        }

        Ok(StreamRun {
            stream: self,
            path,
            watermark,
            next_token: None,
            finished: false,
            stats: RunStats::default(),
        })
    }

    /// Drive a run to completion, collecting every emitted record
    pub async fn read_all(
        &self,
        context: Option<&RequestContext>,
        watermark: ReplicationWatermark,
    ) -> Result<RunOutput> {
        let mut run = self.start(context, watermark)?;
        let mut records = Vec::new();
        while let Some(page) = run.next_page().await? {
            records.extend(page);
        }

        let stats = run.stats();
        Ok(RunOutput {
            records,
            watermark: run.into_watermark(),
            stats,
        })
    }
}

// ============================================================================
// Stream Run
// ============================================================================

/// One run of a resource stream, advanced a page at a time
///
/// The page token lives here and nowhere else; a new run always starts
/// from the first page.
#[derive(Debug)]
pub struct StreamRun<'a> {
    stream: &'a ResourceStream,
    path: String,
    watermark: ReplicationWatermark,
    next_token: Option<PageToken>,
    finished: bool,
    stats: RunStats,
}

impl StreamRun<'_> {
    /// Rendered request path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query of the next request
    ///
    /// The watermark is recomputed here for every page.
    pub fn request_config(&self) -> RequestConfig {
        let definition = self.stream.definition();
        let mut request = RequestConfig::new();

        if let Some(token) = self.next_token {
            request = request.query(PAGE_PARAM, token.to_string());
        }

        if definition.replication_key.is_some() {
            if let Some(since) = self.watermark.query_value() {
                request = request.query(&definition.watermark_param, since);
            }
        }

        for (key, value) in &definition.query {
            request = request.query(key, value);
        }

        request
    }

    /// Fetch, parse and filter the next page
    ///
    /// Returns `None` once the cursor reported the last page. Any failure is
    /// fatal for the run: there is no partial-page recovery.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Record>>> {
        if self.finished {
            return Ok(None);
        }

        let definition = self.stream.definition();
        let request = self.request_config();
        let body = self.stream.client.get_json(&self.path, &request).await?;

        let records = definition.records.extract(&body)?;
        let next = definition.cursor.next(&body, self.next_token)?;
        self.stats.pages += 1;

        let mut emitted = Vec::with_capacity(records.len());
        for record in records {
            match definition.admit(&record)? {
                FilterDecision::Keep => emitted.push(record),
                FilterDecision::Skip(reason) => {
                    let id = field_as_string(&record, "id").unwrap_or_default();
                    info!("{} record {id} skipped: {reason}", definition.name);
                    self.stats.skipped += 1;
                }
            }
        }

        if let Some(key) = &definition.replication_key {
            for record in &emitted {
                self.watermark.observe(record.get(key));
            }
        }
        self.stats.records += emitted.len() as u64;

        match next {
            NextPage::Continue(token) => self.next_token = Some(token),
            NextPage::Done => self.finished = true,
        }

        debug!(
            "{} page {} yielded {} records",
            definition.name,
            self.stats.pages,
            emitted.len()
        );
        Ok(Some(emitted))
    }

    /// Whether the last page has been fetched
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Counters so far
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Watermark, with the high-water mark of the records emitted so far
    pub fn watermark(&self) -> &ReplicationWatermark {
        &self.watermark
    }

    /// Finish the run, keeping its watermark
    pub fn into_watermark(self) -> ReplicationWatermark {
        self.watermark
    }
}
