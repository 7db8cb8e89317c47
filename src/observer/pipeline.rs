// Pipeline orchestrator: recursion guard, preload, ring execution, error translation
use std::sync::Arc;
use std::time::Instant;

use crate::config::{config, PipelineConfig};
use crate::error::PipelineError;
use crate::observer::error::PipelineResult;
use crate::observer::model_record::ModelRecord;
use crate::observer::preloader::Preloader;
use crate::observer::registry::ObserverRegistry;
use crate::observer::runner::ObserverRunner;
use crate::storage::RecordSelect;
use crate::system::System;
use crate::types::{Operation, Record};

/// Entry point for every mutation
pub struct ObserverPipeline {
    runner: ObserverRunner,
    config: PipelineConfig,
}

impl ObserverPipeline {
    pub fn new(registry: Arc<ObserverRegistry>, config: PipelineConfig) -> Self {
        Self {
            runner: ObserverRunner::new(registry, config.observer_timeout()),
            config,
        }
    }

    /// Pipeline using the process-wide configuration
    pub fn with_registry(registry: Arc<ObserverRegistry>) -> Self {
        Self::new(registry, config().pipeline.clone())
    }

    pub fn runner(&self) -> &ObserverRunner {
        &self.runner
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn max_recursion_depth(&self) -> usize {
        self.config.max_recursion_depth
    }

    /// Run a mutation and return the resulting records
    ///
    /// Any collected violation fails the whole batch with
    /// [`PipelineError::Validation`]; nothing is persisted in that case unless
    /// the violation came from a ring after persistence.
    pub async fn run(
        &self,
        system: &Arc<System>,
        operation: Operation,
        model_name: &str,
        data: Vec<Record>,
        select: &dyn RecordSelect,
        depth: usize,
    ) -> Result<Vec<Record>, PipelineError> {
        let result = self.execute(system, operation, model_name, data, select, depth).await?;

        if !result.success {
            tracing::warn!(
                "Pipeline {} on {} failed with {} violation(s)",
                operation, model_name, result.errors.len()
            );
            return Err(PipelineError::from_violations(result.errors));
        }

        Ok(result.records.into_iter().map(ModelRecord::into_record).collect())
    }

    /// Same as [`run`](Self::run) but returns the full result for instrumentation
    pub async fn execute(
        &self,
        system: &Arc<System>,
        operation: Operation,
        model_name: &str,
        data: Vec<Record>,
        select: &dyn RecordSelect,
        depth: usize,
    ) -> Result<PipelineResult, PipelineError> {
        let start_time = Instant::now();

        // Bound cascading mutations before touching storage or observers
        if depth > self.config.max_recursion_depth {
            tracing::error!(
                "Pipeline recursion depth {} exceeds maximum {} ({} on {})",
                depth, self.config.max_recursion_depth, operation, model_name
            );
            return Err(PipelineError::Recursion {
                depth,
                max_depth: self.config.max_recursion_depth,
            });
        }

        let model = system.resolve_model(model_name).await?;

        let mut records: Vec<ModelRecord> = data.into_iter().map(ModelRecord::new).collect();
        let stats = Preloader::preload(select, &model, operation, &mut records).await?;

        let mut ctx = crate::observer::ObserverContext::new(Arc::clone(system), operation, model, records, depth);
        ctx.insert_extension(stats);

        let rings_executed = self.runner.execute_context(&mut ctx).await?;
        let result = ctx.into_result(rings_executed);

        if self.config.debug_logging {
            tracing::debug!(
                "Pipeline {} on {} completed in {:?} (rings: {:?})",
                operation, model_name, start_time.elapsed(), result.rings_executed
            );
        }

        Ok(result)
    }
}
