// Record validation used by the ring 1 observers and `monk describe validate`
pub mod field;
pub mod schema;

pub use field::{validate_constraints, validate_enums, validate_record, validate_required, validate_type};
pub use schema::{prepare_schema, schema_validator, SchemaError, SchemaValidation, SchemaValidator, SchemaViolation};
