//! Static schema declarations
//!
//! Each stream declares its record shape as data: field name, JSON type(s),
//! and format. The engine never inspects these beyond handing them to the
//! sink in `SCHEMA` messages and to `discover`.

mod types;

pub use types::{JsonSchema, JsonType, JsonTypeOrArray, SchemaProperty};
