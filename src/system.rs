// System handle: tenant context plus the collaborators a pipeline run needs
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::model::{Model, ModelRegistry};
use crate::observer::pipeline::ObserverPipeline;
use crate::storage::{RecordPersist, RecordSelect};
use crate::types::{Operation, Record};

/// Per-request handle shared by every observer of a run
///
/// Carries the tenant identity and the injected capabilities: model metadata,
/// row lookup, persistence, and the pipeline itself for nested runs.
pub struct System {
    pub tenant: String,
    pub user_id: Option<Uuid>,
    models: Arc<dyn ModelRegistry>,
    selector: Arc<dyn RecordSelect>,
    persister: Arc<dyn RecordPersist>,
    pipeline: Arc<ObserverPipeline>,
}

impl System {
    pub fn new<S>(
        tenant: impl Into<String>,
        models: Arc<dyn ModelRegistry>,
        storage: Arc<S>,
        pipeline: Arc<ObserverPipeline>,
    ) -> Self
    where
        S: RecordSelect + RecordPersist + 'static,
    {
        let selector: Arc<dyn RecordSelect> = storage.clone();
        let persister: Arc<dyn RecordPersist> = storage;
        Self {
            tenant: tenant.into(),
            user_id: None,
            models,
            selector,
            persister,
            pipeline,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn models(&self) -> &Arc<dyn ModelRegistry> {
        &self.models
    }

    pub fn selector(&self) -> &Arc<dyn RecordSelect> {
        &self.selector
    }

    pub fn persister(&self) -> &Arc<dyn RecordPersist> {
        &self.persister
    }

    pub fn pipeline(&self) -> &Arc<ObserverPipeline> {
        &self.pipeline
    }

    /// Resolve a model, mapping absence to a system error
    pub async fn resolve_model(&self, name: &str) -> Result<Arc<Model>, PipelineError> {
        self.models
            .resolve(name)
            .await
            .ok_or_else(|| PipelineError::System(format!("Model '{}' not found", name)))
    }

    /// Run the pipeline with this system's own select capability
    pub async fn run_at_depth(
        self: &Arc<Self>,
        operation: Operation,
        model_name: &str,
        records: Vec<Record>,
        depth: usize,
    ) -> Result<Vec<Record>, PipelineError> {
        let selector = Arc::clone(&self.selector);
        self.pipeline
            .run(self, operation, model_name, records, selector.as_ref(), depth)
            .await
    }

    // ========================================
    // Bulk methods (plain records in/out)
    // ========================================

    pub async fn create_all(self: &Arc<Self>, model_name: &str, records: Vec<Record>) -> Result<Vec<Record>, PipelineError> {
        self.run_at_depth(Operation::Create, model_name, records, 0).await
    }

    pub async fn update_all(self: &Arc<Self>, model_name: &str, records: Vec<Record>) -> Result<Vec<Record>, PipelineError> {
        self.run_at_depth(Operation::Update, model_name, records, 0).await
    }

    pub async fn delete_all(self: &Arc<Self>, model_name: &str, records: Vec<Record>) -> Result<Vec<Record>, PipelineError> {
        self.run_at_depth(Operation::Delete, model_name, records, 0).await
    }

    pub async fn revert_all(self: &Arc<Self>, model_name: &str, records: Vec<Record>) -> Result<Vec<Record>, PipelineError> {
        self.run_at_depth(Operation::Revert, model_name, records, 0).await
    }

    pub async fn access_all(self: &Arc<Self>, model_name: &str, records: Vec<Record>) -> Result<Vec<Record>, PipelineError> {
        self.run_at_depth(Operation::Access, model_name, records, 0).await
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("tenant", &self.tenant)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}
