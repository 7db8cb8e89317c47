// Built-in observers organized by rings
// Each ring handles a specific phase of record processing

use std::sync::Arc;

use crate::config::AppConfig;
use crate::observer::registry::ObserverRegistryBuilder;

// Ring 0: Data Preparation - preloaded originals must exist
#[path = "0/record_existence.rs"]
pub mod record_existence;

// Ring 1: Input Validation - field metadata and structural schema
#[path = "1/field_validator.rs"]
pub mod field_validator;
#[path = "1/json_schema_validator.rs"]
pub mod json_schema_validator;

// Ring 2: Security - soft delete and system field protection
#[path = "2/soft_delete_protector.rs"]
pub mod soft_delete_protector;
#[path = "2/system_field_protector.rs"]
pub mod system_field_protector;

// Ring 4: Enrichment - ids and timestamps
#[path = "4/timestamp_enricher.rs"]
pub mod timestamp_enricher;

// Ring 7: Audit - change logging
#[path = "7/audit_logger.rs"]
pub mod audit_logger;

pub use audit_logger::AuditLogger;
pub use field_validator::FieldValidator;
pub use json_schema_validator::JsonSchemaValidator;
pub use record_existence::RecordExistenceValidator;
pub use soft_delete_protector::SoftDeleteProtector;
pub use system_field_protector::SystemFieldProtector;
pub use timestamp_enricher::TimestampEnricher;

/// Register the built-in universal observers
///
/// Schema validation and audit logging follow their configuration switches.
pub fn register_builtin_observers(builder: &mut ObserverRegistryBuilder, config: &AppConfig) {
    builder
        .register_universal(Arc::new(RecordExistenceValidator))
        .register_universal(Arc::new(FieldValidator));

    if config.pipeline.enable_schema_validation {
        builder.register_universal(Arc::new(JsonSchemaValidator));
    }

    builder
        .register_universal(Arc::new(SoftDeleteProtector))
        .register_universal(Arc::new(SystemFieldProtector))
        .register_universal(Arc::new(TimestampEnricher));

    if config.security.enable_audit_logging {
        builder.register_universal(Arc::new(AuditLogger));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::registry::ObserverRegistry;
    use crate::observer::traits::ObserverRing;
    use crate::types::Operation;

    #[test]
    fn switches_gate_optional_observers() {
        let mut config = AppConfig::default();
        config.pipeline.enable_schema_validation = false;
        config.security.enable_audit_logging = false;

        let mut builder = ObserverRegistry::builder();
        register_builtin_observers(&mut builder, &config);
        let registry = builder.build();

        assert_eq!(registry.len(), 5);
        let ring1: Vec<_> = registry
            .observers_for("any", ObserverRing::InputValidation, Operation::Create)
            .iter()
            .map(|o| o.name())
            .collect();
        assert_eq!(ring1, vec!["FieldValidator"]);
        assert!(registry.observers("any", ObserverRing::Audit).is_empty());
    }

    #[test]
    fn all_builtins_are_universal() {
        let mut config = AppConfig::default();
        config.pipeline.enable_schema_validation = true;
        config.security.enable_audit_logging = true;

        let mut builder = ObserverRegistry::builder();
        register_builtin_observers(&mut builder, &config);
        let registry = builder.build();

        assert_eq!(registry.len(), 7);
        assert_eq!(registry.observers("whatever", ObserverRing::Security).len(), 2);
    }
}
