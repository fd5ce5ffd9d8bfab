//! Resource streams
//!
//! A resource stream drives one endpoint to completion for a run:
//!
//! ```text
//! START -> (REQUEST -> PARSE -> [FILTER] -> EMIT)* -> END
//! ```
//!
//! Behavior that differs between resources (status filters, the export
//! condition, child-context derivation, watermark use) is declared on a
//! [`StreamDefinition`] rather than coded per resource.

mod definition;
mod filters;
mod resource;

pub use definition::{ContextMapping, RecordsLocation, StreamDefinition, DEFAULT_WATERMARK_PARAM};
pub use filters::{
    resolve_statuses, FilterDecision, RecordFilter, StatusFilter, StatusTable,
    CUSTOM_FIELDS_FIELD, DOCUMENT_STATUSES, STATUS_PARAM, SUPPLIER_STATUSES,
};
pub use resource::{ResourceStream, RunOutput, RunStats, StreamRun};
