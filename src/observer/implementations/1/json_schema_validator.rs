// Ring 1: JSON Schema Validator - structural check against the model's schema definition
use async_trait::async_trait;

use crate::observer::context::ObserverContext;
use crate::observer::error::{codes, ObserverError, ValidationError};
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::{is_system_field, Operation};
use crate::validation::schema_validator;

/// Ring 1: structural validation with the cached compiled schema
///
/// Records the field validator already rejected are skipped so each bad value
/// is reported once.
#[derive(Default)]
pub struct JsonSchemaValidator;

#[async_trait]
impl Observer for JsonSchemaValidator {
    fn name(&self) -> &'static str {
        "JsonSchemaValidator"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn operations(&self) -> Option<&'static [Operation]> {
        Some(&[Operation::Create, Operation::Update])
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        if !ctx.model.schema_definition.is_object() {
            return Ok(());
        }

        let mut violations = Vec::new();
        for (index, record) in ctx.records.iter().enumerate() {
            if ctx.record_has_errors(index) {
                continue;
            }

            let mut candidate = match ctx.operation {
                Operation::Update => record.merged(),
                _ => record.working().clone(),
            };
            // Storage-managed columns are not part of model definitions
            candidate.retain(|field, _| !is_system_field(field) || ctx.model.field(field).is_some());

            let outcome = schema_validator()
                .validate(&ctx.model, &candidate)
                .map_err(|e| ObserverError::SystemError(e.to_string()))?;

            for violation in outcome.errors {
                let mut error = ValidationError::new(codes::SCHEMA_VALIDATION, violation.message.clone())
                    .at_record(index)
                    .with_details(serde_json::json!({ "path": violation.path }));
                if let Some(field) = violation.field() {
                    error = error.with_field(field);
                }
                violations.push(error);
            }
        }

        for violation in violations {
            ctx.add_error(violation);
        }
        Ok(())
    }
}
