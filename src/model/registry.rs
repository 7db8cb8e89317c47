use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::{Model, ModelError};

/// Model metadata lookup consumed by the pipeline
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Resolve a model by name; `None` when no such model exists
    async fn resolve(&self, name: &str) -> Option<Arc<Model>>;
}

/// Fixed set of models loaded up front (definition files, tests, CLI)
#[derive(Debug, Default, Clone)]
pub struct StaticModelRegistry {
    models: HashMap<String, Arc<Model>>,
}

impl StaticModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: Model) -> Self {
        self.insert(model);
        self
    }

    pub fn insert(&mut self, model: Model) {
        tracing::debug!("Registered model '{}' with {} fields", model.name, model.fields.len());
        self.models.insert(model.name.clone(), Arc::new(model));
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build from an object mapping model name -> JSON Schema definition
    pub fn from_definitions(definitions: Value) -> Result<Self, ModelError> {
        let definitions = match definitions {
            Value::Object(map) => map,
            _ => {
                return Err(ModelError::InvalidFormat {
                    model: "*".to_string(),
                    message: "model definitions must be an object keyed by model name".to_string(),
                })
            }
        };

        let mut registry = Self::new();
        for (name, definition) in definitions {
            registry.insert(Model::from_json_schema(name, definition)?);
        }
        Ok(registry)
    }

    /// Load definitions from a `.json`, `.yaml` or `.yml` file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let definitions: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        Self::from_definitions(definitions)
    }
}

#[async_trait]
impl ModelRegistry for StaticModelRegistry {
    async fn resolve(&self, name: &str) -> Option<Arc<Model>> {
        self.models.get(name).cloned()
    }
}
