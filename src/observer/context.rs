use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::error::PipelineError;
use crate::model::Model;
use crate::observer::error::{PipelineResult, ValidationError, ValidationWarning};
use crate::observer::model_record::ModelRecord;
use crate::observer::traits::ObserverRing;
use crate::system::System;
use crate::types::{Operation, Record};

/// Shared state for one pipeline run
///
/// Passed by `&mut` to every observer in ring order. Errors and warnings are
/// append-only: observers can add to them but never remove, so once an error is
/// recorded the run stays failed.
pub struct ObserverContext {
    // Core request data
    pub system: Arc<System>,
    pub operation: Operation,
    pub model: Arc<Model>,

    // Records wrapped for this run
    pub records: Vec<ModelRecord>,

    /// Target id for single-record operations
    pub record_id: Option<String>,

    // Rows returned by the persistence capability (populated by ring 5)
    pub result: Option<Vec<Record>>,

    // Cross-ring communication: string keys for caller-visible values,
    // typed extensions for structured data shared between observers
    metadata: Map<String, Value>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,

    // Error and warning accumulation
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,

    // Performance tracking
    pub start_time: Instant,
    pub current_ring: Option<ObserverRing>,

    /// Nesting level; observers re-entering the pipeline run at `depth + 1`
    pub depth: usize,
}

impl ObserverContext {
    pub fn new(
        system: Arc<System>,
        operation: Operation,
        model: Arc<Model>,
        records: Vec<ModelRecord>,
        depth: usize,
    ) -> Self {
        let record_id = match records.as_slice() {
            [single] => single.id().map(str::to_string),
            _ => None,
        };

        Self {
            system,
            operation,
            model,
            records,
            record_id,
            result: None,
            metadata: Map::new(),
            extensions: HashMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            start_time: Instant::now(),
            current_ring: None,
            depth,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model.name
    }

    // === Metadata ===

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn metadata_map(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Store typed data for other observers - compile-time type safety
    pub fn insert_extension<T: Send + Sync + 'static>(&mut self, data: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(data));
    }

    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    pub fn extension_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.extensions.get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut::<T>())
    }

    // === Errors and warnings ===

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether a specific record already has a violation
    pub fn record_has_errors(&self, index: usize) -> bool {
        self.errors.iter().any(|e| e.record_index == Some(index))
    }

    /// Tag errors and warnings added since the given positions with the observer's name
    pub(crate) fn attribute_since(&mut self, errors_from: usize, warnings_from: usize, observer: &str) {
        for error in self.errors.iter_mut().skip(errors_from) {
            error.observer.get_or_insert_with(|| observer.to_string());
        }
        for warning in self.warnings.iter_mut().skip(warnings_from) {
            warning.observer.get_or_insert_with(|| observer.to_string());
        }
    }

    /// Get total execution time
    pub fn execution_time(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    // === Record Helper Methods ===

    /// Check if any records have changes
    pub fn has_record_changes(&self) -> bool {
        self.records.iter()
            .any(|record| !record.changes().is_empty())
    }

    /// Run another pipeline from inside an observer, one level deeper
    pub async fn run_nested(
        &self,
        operation: Operation,
        model_name: &str,
        records: Vec<Record>,
    ) -> Result<Vec<Record>, PipelineError> {
        let system = Arc::clone(&self.system);
        system.run_at_depth(operation, model_name, records, self.depth + 1).await
    }

    pub(crate) fn into_result(self, rings_executed: Vec<ObserverRing>) -> PipelineResult {
        PipelineResult {
            success: self.errors.is_empty(),
            execution_time: self.start_time.elapsed(),
            result: self.result,
            errors: self.errors,
            warnings: self.warnings,
            metadata: self.metadata,
            records: self.records,
            rings_executed,
        }
    }
}

impl fmt::Debug for ObserverContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverContext")
            .field("operation", &self.operation)
            .field("model", &self.model.name)
            .field("records", &self.records.len())
            .field("record_id", &self.record_id)
            .field("errors", &self.errors)
            .field("warnings", &self.warnings)
            .field("current_ring", &self.current_ring)
            .field("depth", &self.depth)
            .finish()
    }
}

/// Statistics from the batched preload, shared with ring 0 observers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadStats {
    pub requested_count: usize,
    pub found_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, record};
    use serde_json::json;

    fn ctx(records: Vec<ModelRecord>) -> ObserverContext {
        context(Operation::Update, Model::new("thing"), records)
    }

    #[test]
    fn single_record_sets_record_id() {
        let single = ctx(vec![ModelRecord::new(record(json!({ "id": "a1" })))]);
        assert_eq!(single.record_id.as_deref(), Some("a1"));

        let batch = ctx(vec![
            ModelRecord::new(record(json!({ "id": "a1" }))),
            ModelRecord::new(record(json!({ "id": "a2" }))),
        ]);
        assert_eq!(batch.record_id, None);
    }

    #[test]
    fn attribution_only_touches_new_entries() {
        let mut ctx = ctx(Vec::new());
        ctx.add_error(ValidationError::new("FIRST", "before").with_observer("Earlier"));
        ctx.add_warning(ValidationWarning::new("NOTE", "before"));

        let (errors_from, warnings_from) = (ctx.errors().len(), ctx.warnings().len());
        ctx.add_error(ValidationError::new("SECOND", "mine"));
        ctx.add_error(ValidationError::new("THIRD", "named").with_observer("Explicit"));
        ctx.add_warning(ValidationWarning::new("HINT", "mine"));
        ctx.attribute_since(errors_from, warnings_from, "Current");

        let observers: Vec<_> = ctx.errors().iter().map(|e| e.observer.as_deref()).collect();
        assert_eq!(observers, vec![Some("Earlier"), Some("Current"), Some("Explicit")]);
        assert_eq!(ctx.warnings()[0].observer, None);
        assert_eq!(ctx.warnings()[1].observer.as_deref(), Some("Current"));
    }

    #[test]
    fn record_errors_are_tracked_by_index() {
        let mut ctx = ctx(Vec::new());
        assert!(!ctx.has_errors());
        ctx.add_error(ValidationError::new("BAD", "second record").at_record(1));
        assert!(ctx.has_errors());
        assert!(ctx.record_has_errors(1));
        assert!(!ctx.record_has_errors(0));
    }

    #[test]
    fn extensions_are_keyed_by_type() {
        let mut ctx = ctx(Vec::new());
        assert!(ctx.extension::<PreloadStats>().is_none());

        ctx.insert_extension(PreloadStats { requested_count: 3, found_count: 2 });
        ctx.extension_mut::<PreloadStats>().expect("stats present").found_count = 3;
        assert_eq!(
            ctx.extension::<PreloadStats>(),
            Some(&PreloadStats { requested_count: 3, found_count: 3 })
        );
        assert!(ctx.extension::<usize>().is_none());
    }

    #[test]
    fn result_carries_metadata_and_success() {
        let mut ctx = ctx(Vec::new());
        ctx.set_metadata("audited_records", 2);
        ctx.add_warning(ValidationWarning::new("HINT", "non-blocking"));

        let result = ctx.into_result(vec![ObserverRing::DataPreparation]);
        assert!(result.success);
        assert_eq!(result.metadata.get("audited_records"), Some(&json!(2)));
        assert_eq!(result.rings_executed, vec![ObserverRing::DataPreparation]);
        assert_eq!(result.warnings.len(), 1);
    }
}
