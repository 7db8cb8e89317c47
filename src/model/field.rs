use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared scalar type of a model field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Integer,
    Numeric,
    Boolean,
    Object,
    Uuid,
    Timestamp,
    Date,
    /// Types this crate does not check; storage decides
    Unknown(String),
}

impl FieldType {
    /// Map a JSON Schema `type` (+ optional `format`) or an explicit type name
    pub fn from_schema(type_name: &str, format: Option<&str>) -> Self {
        match (type_name, format) {
            ("string", Some("uuid")) => FieldType::Uuid,
            ("string", Some("date-time")) => FieldType::Timestamp,
            ("string", Some("date")) => FieldType::Date,
            ("string", _) | ("text", _) => FieldType::Text,
            ("integer", _) => FieldType::Integer,
            ("number", _) | ("numeric", _) | ("decimal", _) => FieldType::Numeric,
            ("boolean", _) => FieldType::Boolean,
            ("object", _) | ("jsonb", _) => FieldType::Object,
            ("uuid", _) => FieldType::Uuid,
            ("timestamp", _) => FieldType::Timestamp,
            ("date", _) => FieldType::Date,
            (other, _) => FieldType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Numeric => "numeric",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Uuid => "uuid",
            FieldType::Timestamp => "timestamp",
            FieldType::Date => "date",
            FieldType::Unknown(name) => name,
        }
    }
}

/// Per-field metadata used by the field validators
#[derive(Debug, Clone)]
pub struct FieldMetadata {
    pub name: String,
    pub field_type: FieldType,
    pub is_array: bool,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub pattern: Option<Regex>,
    pub enum_values: Option<Vec<Value>>,
    pub description: Option<String>,
}

impl FieldMetadata {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_array: false,
            minimum: None,
            maximum: None,
            pattern: None,
            enum_values: None,
            description: None,
        }
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    /// Human-readable type label, e.g. `integer[]`
    pub fn type_label(&self) -> String {
        if self.is_array {
            format!("{}[]", self.field_type.as_str())
        } else {
            self.field_type.as_str().to_string()
        }
    }
}
