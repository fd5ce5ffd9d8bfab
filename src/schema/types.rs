//! Schema types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON Schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonType::String => write!(f, "string"),
            JsonType::Number => write!(f, "number"),
            JsonType::Integer => write!(f, "integer"),
            JsonType::Boolean => write!(f, "boolean"),
            JsonType::Object => write!(f, "object"),
            JsonType::Array => write!(f, "array"),
            JsonType::Null => write!(f, "null"),
        }
    }
}

/// JSON type can be a single type or array of types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonTypeOrArray {
    Single(JsonType),
    Multiple(Vec<JsonType>),
}

impl JsonTypeOrArray {
    /// Create a nullable type
    pub fn nullable(t: JsonType) -> Self {
        if t == JsonType::Null {
            JsonTypeOrArray::Single(JsonType::Null)
        } else {
            JsonTypeOrArray::Multiple(vec![t, JsonType::Null])
        }
    }

    /// Check if this type is nullable
    pub fn is_nullable(&self) -> bool {
        match self {
            JsonTypeOrArray::Single(t) => *t == JsonType::Null,
            JsonTypeOrArray::Multiple(types) => types.contains(&JsonType::Null),
        }
    }

    /// Check if a type is allowed
    pub fn allows(&self, t: JsonType) -> bool {
        match self {
            JsonTypeOrArray::Single(single) => *single == t,
            JsonTypeOrArray::Multiple(types) => types.contains(&t),
        }
    }
}

/// JSON Schema property definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaProperty {
    /// Property type(s)
    #[serde(rename = "type")]
    pub json_type: JsonTypeOrArray,

    /// Format hint (e.g., "date-time")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Nested properties (for objects)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaProperty>>,

    /// Array items schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaProperty>>,
}

impl SchemaProperty {
    /// Create a nullable property
    pub fn nullable(json_type: JsonType) -> Self {
        Self {
            json_type: JsonTypeOrArray::nullable(json_type),
            format: None,
            properties: None,
            items: None,
        }
    }

    /// Property accepting exactly the listed types
    pub fn one_of(types: &[JsonType]) -> Self {
        Self {
            json_type: JsonTypeOrArray::Multiple(types.to_vec()),
            format: None,
            properties: None,
            items: None,
        }
    }

    /// Nullable date-time string
    pub fn date_time() -> Self {
        Self::nullable(JsonType::String).with_format("date-time")
    }

    /// Nullable object property with nested properties
    pub fn object(properties: &[(&str, SchemaProperty)]) -> Self {
        Self {
            properties: Some(
                properties
                    .iter()
                    .map(|(name, p)| ((*name).to_string(), p.clone()))
                    .collect(),
            ),
            ..Self::nullable(JsonType::Object)
        }
    }

    /// Nullable array property with item schema
    pub fn array(items: SchemaProperty) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::nullable(JsonType::Array)
        }
    }

    /// Set format hint
    #[must_use]
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    /// Check if nullable
    pub fn is_nullable(&self) -> bool {
        self.json_type.is_nullable()
    }
}

/// Record schema of one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Schema type (always "object" for top-level)
    #[serde(rename = "type")]
    pub json_type: JsonType,

    /// Object properties
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaProperty>,
}

impl Default for JsonSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonSchema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self {
            json_type: JsonType::Object,
            properties: BTreeMap::new(),
        }
    }

    /// Add a property
    #[must_use]
    pub fn with(mut self, name: &str, property: SchemaProperty) -> Self {
        self.properties.insert(name.to_string(), property);
        self
    }

    /// Add a nullable string property
    #[must_use]
    pub fn string(self, name: &str) -> Self {
        self.with(name, SchemaProperty::nullable(JsonType::String))
    }

    /// Add a nullable number property
    #[must_use]
    pub fn number(self, name: &str) -> Self {
        self.with(name, SchemaProperty::nullable(JsonType::Number))
    }

    /// Add a nullable integer property
    #[must_use]
    pub fn integer(self, name: &str) -> Self {
        self.with(name, SchemaProperty::nullable(JsonType::Integer))
    }

    /// Add a nullable boolean property
    #[must_use]
    pub fn boolean(self, name: &str) -> Self {
        self.with(name, SchemaProperty::nullable(JsonType::Boolean))
    }

    /// Add a nullable date-time property
    #[must_use]
    pub fn date_time(self, name: &str) -> Self {
        self.with(name, SchemaProperty::date_time())
    }

    /// Add a property accepting exactly the listed types
    #[must_use]
    pub fn one_of(self, name: &str, types: &[JsonType]) -> Self {
        self.with(name, SchemaProperty::one_of(types))
    }

    /// Get a property
    pub fn get_property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.get(name)
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
