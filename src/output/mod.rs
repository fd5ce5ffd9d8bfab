//! Output module
//!
//! Emits the run as a stream of JSON-lines messages for downstream loaders.
//!
//! # Overview
//!
//! - `Message` - `SCHEMA`, `RECORD` and `STATE` messages
//! - `RecordSink` - where messages go; the engine never inspects them again
//! - `JsonLinesSink` - one JSON document per line on any writer (stdout)
//! - `MemorySink` - collects messages in memory

mod message;
mod sink;

pub use message::Message;
pub use sink::{JsonLinesSink, MemorySink, RecordSink};
