// Ring 1: Field Validator - required, type, constraint and enum checks
use async_trait::async_trait;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;
use crate::validation::validate_record;

/// Ring 1: validates every record of the batch against the model's field metadata
///
/// Updates are checked as the row will look afterwards (original overlaid with
/// the incoming fields), so a partial update does not trip required checks.
#[derive(Default)]
pub struct FieldValidator;

#[async_trait]
impl Observer for FieldValidator {
    fn name(&self) -> &'static str {
        "FieldValidator"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn operations(&self) -> Option<&'static [Operation]> {
        Some(&[Operation::Create, Operation::Update])
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        if ctx.model.fields.is_empty() && ctx.model.required_fields.is_empty() {
            return Ok(());
        }

        let mut violations = Vec::new();
        for (index, record) in ctx.records.iter().enumerate() {
            let errors = match ctx.operation {
                Operation::Update => validate_record(&record.merged(), index, &ctx.model),
                _ => validate_record(record.working(), index, &ctx.model),
            };
            violations.extend(errors);
        }

        if !violations.is_empty() {
            tracing::debug!(
                "Field validation found {} violation(s) in {} on {}",
                violations.len(), ctx.operation, ctx.model_name()
            );
        }

        for violation in violations {
            ctx.add_error(violation);
        }
        Ok(())
    }
}
