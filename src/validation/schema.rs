// Structural validation against each model's JSON Schema, compiled once per model
use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::model::{FieldType, Model};
use crate::types::{is_system_field, Record};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to compile schema for model '{model}': {message}")]
    Compile { model: String, message: String },

    #[error("Schema cache lock poisoned")]
    CachePoisoned,
}

/// One structural violation, located by JSON pointer into the record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    /// Top-level field the violation points at, if any
    pub fn field(&self) -> Option<&str> {
        self.path.trim_start_matches('/').split('/').next().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaValidation {
    pub valid: bool,
    pub errors: Vec<SchemaViolation>,
}

struct CachedSchema {
    definition: Value,
    compiled: Arc<JSONSchema>,
}

/// Compiled-validator cache keyed by model name
///
/// An entry is recompiled when the model's stored definition changes.
pub struct SchemaValidator {
    cache: RwLock<HashMap<String, CachedSchema>>,
}

static SCHEMA_VALIDATOR: Lazy<SchemaValidator> = Lazy::new(SchemaValidator::new);

/// Process-wide validator shared by every pipeline run
pub fn schema_validator() -> &'static SchemaValidator {
    &SCHEMA_VALIDATOR
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn validate(&self, model: &Model, record: &Record) -> Result<SchemaValidation, SchemaError> {
        if !model.schema_definition.is_object() {
            return Ok(SchemaValidation { valid: true, errors: Vec::new() });
        }

        let compiled = self.compiled(model)?;
        let instance = Value::Object(record.clone());

        let errors: Vec<SchemaViolation> = match compiled.validate(&instance) {
            Ok(()) => Vec::new(),
            Err(iter) => iter
                .map(|error| SchemaViolation {
                    path: error.instance_path.to_string(),
                    message: error.to_string(),
                })
                .collect(),
        };

        Ok(SchemaValidation {
            valid: errors.is_empty(),
            errors,
        })
    }

    pub fn cached_models(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    fn compiled(&self, model: &Model) -> Result<Arc<JSONSchema>, SchemaError> {
        {
            let cache = self.cache.read().map_err(|_| SchemaError::CachePoisoned)?;
            if let Some(entry) = cache.get(&model.name) {
                if entry.definition == model.schema_definition {
                    return Ok(Arc::clone(&entry.compiled));
                }
            }
        }

        let prepared = prepare_schema(model);
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&prepared)
            .map_err(|e| SchemaError::Compile {
                model: model.name.clone(),
                message: e.to_string(),
            })?;
        let compiled = Arc::new(compiled);

        tracing::debug!("Compiled schema validator for model {}", model.name);

        let mut cache = self.cache.write().map_err(|_| SchemaError::CachePoisoned)?;
        cache.insert(
            model.name.clone(),
            CachedSchema {
                definition: model.schema_definition.clone(),
                compiled: Arc::clone(&compiled),
            },
        );
        Ok(compiled)
    }
}

/// Shape a model's definition into the schema that gets compiled
///
/// Property types are first relaxed to what the field validators accept:
/// numeric fields also take decimal strings and timestamp fields drop the
/// strict `date-time` format. Then every optional, non-system property is made
/// nullable. Enum properties become `anyOf: [{type: null}, {..original..}]`
/// with the description kept at the top; other properties gain `"null"` in `type`.
pub fn prepare_schema(model: &Model) -> Value {
    let mut schema = model.schema_definition.clone();

    let required: HashSet<String> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    let Some(properties) = schema.get_mut("properties").and_then(Value::as_object_mut) else {
        return schema;
    };

    for (name, property) in properties.iter_mut() {
        let Some(object) = property.as_object_mut() else {
            continue;
        };

        if let Some(field) = model.field(name) {
            if field.is_array {
                if let Some(items) = object.get_mut("items").and_then(Value::as_object_mut) {
                    relax_to_field_type(items, &field.field_type);
                }
            } else {
                relax_to_field_type(object, &field.field_type);
            }
        }

        if required.contains(name) || is_system_field(name) {
            continue;
        }

        if object.contains_key("enum") {
            let description = object.remove("description");
            let constrained = Value::Object(std::mem::take(object));

            let mut nullable = Map::new();
            if let Some(description) = description {
                nullable.insert("description".to_string(), description);
            }
            nullable.insert("anyOf".to_string(), json!([{ "type": "null" }, constrained]));
            *property = Value::Object(nullable);
            continue;
        }

        add_type(object, "null");
    }

    schema
}

fn relax_to_field_type(object: &mut Map<String, Value>, field_type: &FieldType) {
    match field_type {
        FieldType::Numeric => add_type(object, "string"),
        FieldType::Timestamp => {
            if object.get("format").and_then(Value::as_str) == Some("date-time") {
                object.remove("format");
            }
        }
        _ => {}
    }
}

/// Add `extra` to a declared `type`, turning a single type into a list
fn add_type(object: &mut Map<String, Value>, extra: &str) {
    match object.get_mut("type") {
        Some(Value::String(single)) if single != extra => {
            let widened = json!([single.clone(), extra]);
            object.insert("type".to_string(), widened);
        }
        Some(Value::Array(types)) if !types.iter().any(|t| t == extra) => {
            types.push(json!(extra));
        }
        _ => {}
    }
}
