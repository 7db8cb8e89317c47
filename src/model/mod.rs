// Model metadata: field definitions and the structural schema for each model
pub mod field;
pub mod registry;

pub use field::*;
pub use registry::*;

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid schema format for model '{model}': {message}")]
    InvalidFormat { model: String, message: String },

    #[error("Invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Resolved model definition consumed by the pipeline
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub required_fields: BTreeSet<String>,
    pub fields: BTreeMap<String, FieldMetadata>,
    /// Raw JSON Schema definition used by the structural validator
    pub schema_definition: Value,
}

impl Model {
    /// Model with no declared fields; every record passes field validation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required_fields: BTreeSet::new(),
            fields: BTreeMap::new(),
            schema_definition: Value::Null,
        }
    }

    pub fn with_field(mut self, field: FieldMetadata) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn with_required(mut self, field: impl Into<String>) -> Self {
        self.required_fields.insert(field.into());
        self
    }

    pub fn is_required(&self, field: &str) -> bool {
        self.required_fields.contains(field)
    }

    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.get(name)
    }

    /// Build a model from a JSON Schema object definition
    ///
    /// Reads `properties` (with `type`, `format`, `items`, `enum`, `minimum`,
    /// `maximum`, `pattern`, `description`, `x-monk-type`) and `required`.
    pub fn from_json_schema(name: impl Into<String>, definition: Value) -> Result<Self, ModelError> {
        let name = name.into();
        let invalid = |message: &str| ModelError::InvalidFormat {
            model: name.clone(),
            message: message.to_string(),
        };

        let root = definition.as_object().ok_or_else(|| invalid("definition must be an object"))?;

        let required_fields = match root.get("required") {
            None | Some(Value::Null) => BTreeSet::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).ok_or_else(|| invalid("required must list field names")))
                .collect::<Result<_, _>>()?,
            Some(_) => return Err(invalid("required must be an array")),
        };

        let mut fields = BTreeMap::new();
        if let Some(properties) = root.get("properties") {
            let properties = properties.as_object().ok_or_else(|| invalid("properties must be an object"))?;
            for (field_name, property) in properties {
                let property = property
                    .as_object()
                    .ok_or_else(|| invalid(&format!("property '{}' must be an object", field_name)))?;
                fields.insert(field_name.clone(), Self::parse_property(field_name, property)?);
            }
        }

        Ok(Self {
            name,
            required_fields,
            fields,
            schema_definition: definition,
        })
    }

    fn parse_property(field_name: &str, property: &Map<String, Value>) -> Result<FieldMetadata, ModelError> {
        let declared = Self::declared_type(property);
        let format = property.get("format").and_then(Value::as_str);

        let (field_type, is_array, element) = match declared.as_deref() {
            Some("array") => {
                let items = property.get("items").and_then(Value::as_object);
                let element_type = items
                    .and_then(Self::declared_type)
                    .unwrap_or_else(|| "unknown".to_string());
                let element_format = items.and_then(|i| i.get("format")).and_then(Value::as_str);
                (FieldType::from_schema(&element_type, element_format), true, items)
            }
            Some(other) => (FieldType::from_schema(other, format), false, None),
            None => (FieldType::Unknown("any".to_string()), false, None),
        };

        // Constraints on arrays may be declared on the items schema
        let lookup = |key: &str| property.get(key).or_else(|| element.and_then(|items| items.get(key)));

        let pattern = match lookup("pattern").and_then(Value::as_str) {
            Some(source) => Some(Regex::new(source).map_err(|source| ModelError::InvalidPattern {
                field: field_name.to_string(),
                source,
            })?),
            None => None,
        };

        Ok(FieldMetadata {
            name: field_name.to_string(),
            field_type,
            is_array,
            minimum: lookup("minimum").and_then(Value::as_f64),
            maximum: lookup("maximum").and_then(Value::as_f64),
            pattern,
            enum_values: lookup("enum").and_then(Value::as_array).cloned(),
            description: property.get("description").and_then(Value::as_str).map(str::to_string),
        })
    }

    /// First non-null entry of `type`, or the explicit `x-monk-type` override
    fn declared_type(property: &Map<String, Value>) -> Option<String> {
        if let Some(explicit) = property.get("x-monk-type").and_then(Value::as_str) {
            return Some(explicit.to_string());
        }
        match property.get("type") {
            Some(Value::String(t)) => Some(t.clone()),
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null")
                .map(str::to_string),
            _ => None,
        }
    }
}
