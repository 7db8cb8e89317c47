// Ring 2: System Field Protector - callers cannot write storage-managed fields
use async_trait::async_trait;
use serde_json::Value;

use crate::observer::context::ObserverContext;
use crate::observer::error::{codes, ObserverError, ValidationError};
use crate::observer::traits::{Observer, ObserverRing};
use crate::types::{is_system_field, Operation};

/// Ring 2: strips echoed system fields and rejects attempts to change them
///
/// `id` is left alone since it addresses the row. A null or unchanged value is
/// dropped silently; anything else is `SYSTEM_FIELD_READONLY`.
#[derive(Default)]
pub struct SystemFieldProtector;

#[async_trait]
impl Observer for SystemFieldProtector {
    fn name(&self) -> &'static str {
        "SystemFieldProtector"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Security
    }

    fn operations(&self) -> Option<&'static [Operation]> {
        Some(&[Operation::Create, Operation::Update])
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let mut violations = Vec::new();

        for (index, record) in ctx.records.iter_mut().enumerate() {
            let protected: Vec<String> = record
                .working()
                .keys()
                .filter(|field| is_system_field(field) && field.as_str() != "id")
                .cloned()
                .collect();

            for field in protected {
                let echoed = match record.get(&field) {
                    Some(Value::Null) | None => true,
                    Some(value) => record.get_original(&field) == Some(value),
                };

                if echoed {
                    record.remove(&field);
                } else {
                    violations.push(
                        ValidationError::new(
                            codes::SYSTEM_FIELD_READONLY,
                            format!("System field '{}' cannot be modified", field),
                        )
                        .with_field(field.as_str())
                        .at_record(index),
                    );
                }
            }
        }

        for violation in violations {
            ctx.add_error(violation);
        }
        Ok(())
    }
}
