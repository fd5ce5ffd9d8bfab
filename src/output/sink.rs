//! Message sinks

use super::message::Message;
use crate::error::{Error, Result};
use crate::state::State;
use crate::types::Record;
use async_trait::async_trait;
use std::io::Write;

/// Destination of the messages produced by a run
#[async_trait]
pub trait RecordSink: Send {
    /// Emit one message
    async fn emit(&mut self, message: Message) -> Result<()>;

    /// Flush buffered output
    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// JSON Lines
// ============================================================================

/// Writes each message as one line of JSON
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
    written: u64,
}

impl JsonLinesSink<std::io::Stdout> {
    /// Sink writing to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Create a sink over any writer
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of messages written
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    async fn emit(&mut self, message: Message) -> Result<()> {
        let line = serde_json::to_string(&message)?;
        writeln!(self.writer, "{line}")?;
        self.written += 1;

        // state lines are checkpoints, make them visible right away
        if matches!(message, Message::State { .. }) {
            self.writer.flush()?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::Io)
    }
}

// ============================================================================
// In Memory
// ============================================================================

/// Collects messages in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    messages: Vec<Message>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages, in emission order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Records emitted for a stream, in emission order
    pub fn records(&self, stream: &str) -> Vec<&Record> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream: s, record, ..
                } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// State messages, in emission order
    pub fn states(&self) -> Vec<&State> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State { value } => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Names of streams a schema was emitted for
    pub fn schema_streams(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Schema { stream, .. } => Some(stream.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn emit(&mut self, message: Message) -> Result<()> {
        self.messages.push(message);
        Ok(())
    }
}
