// Ring 0: Record Existence Validator - non-create records must target a preloaded row
use async_trait::async_trait;

use crate::observer::context::{ObserverContext, PreloadStats};
use crate::observer::error::{codes, ObserverError, ValidationError};
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

/// Ring 0: every update/delete/revert/access record needs an id and an original
#[derive(Default)]
pub struct RecordExistenceValidator;

#[async_trait]
impl Observer for RecordExistenceValidator {
    fn name(&self) -> &'static str {
        "RecordExistenceValidator"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::DataPreparation
    }

    fn operations(&self) -> Option<&'static [Operation]> {
        Some(&[Operation::Update, Operation::Delete, Operation::Revert, Operation::Access])
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        if let Some(stats) = ctx.extension::<PreloadStats>() {
            tracing::debug!(
                "Preload found {}/{} records for {} on {}",
                stats.found_count, stats.requested_count, ctx.operation, ctx.model_name()
            );
        }

        let mut violations = Vec::new();
        for (index, record) in ctx.records.iter().enumerate() {
            match record.id() {
                None => violations.push(
                    ValidationError::new(
                        codes::MISSING_RECORD_ID,
                        format!("{} requires a record id", ctx.operation),
                    )
                    .with_field("id")
                    .at_record(index),
                ),
                Some(id) if !record.has_original() => violations.push(
                    ValidationError::new(
                        codes::RECORD_NOT_FOUND,
                        format!("Record {} not found in {}", id, ctx.model_name()),
                    )
                    .with_field("id")
                    .at_record(index),
                ),
                Some(_) => {}
            }
        }

        for violation in violations {
            ctx.add_error(violation);
        }
        Ok(())
    }
}
