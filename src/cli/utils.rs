use anyhow::Context;
use serde_json::{json, Value};
use std::path::Path;

use crate::cli::OutputFormat;
use crate::error::PipelineError;
use crate::model::StaticModelRegistry;
use crate::observer::error::ValidationError;
use crate::types::Record;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(response), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                response.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Output a pipeline failure with every violation
pub fn output_pipeline_error(output_format: &OutputFormat, error: &PipelineError) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&error.to_json())?);
        }
        OutputFormat::Text => {
            eprintln!("Error [{}]: {}", error.code(), error);
            output_violations(error.violations());
        }
    }
    Ok(())
}

/// One line per violation on stderr
pub fn output_violations(violations: &[ValidationError]) {
    for violation in violations {
        let location = match (violation.record_index, violation.field.as_deref()) {
            (Some(index), Some(field)) => format!("record {} field {}", index, field),
            (Some(index), None) => format!("record {}", index),
            (None, Some(field)) => format!("field {}", field),
            (None, None) => "batch".to_string(),
        };
        let observer = violation.observer.as_deref().unwrap_or("-");
        eprintln!("  - {} ({}, {}): {}", violation.code, location, observer, violation.message);
    }
}

/// Print records as a JSON document or one compact line per record
pub fn output_records(output_format: &OutputFormat, message: &str, records: &[Record]) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_success(output_format, message, Some(json!({ "records": records }))),
        OutputFormat::Text => {
            println!("✓ {}", message);
            for record in records {
                println!("{}", serde_json::to_string(record)?);
            }
            Ok(())
        }
    }
}

/// Read a JSON or YAML document, chosen by file extension
pub fn read_document(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?,
        _ => serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))?,
    };
    Ok(value)
}

/// Accept either a single record object or an array of them
pub fn records_from_value(value: Value) -> anyhow::Result<Vec<Record>> {
    match value {
        Value::Object(record) => Ok(vec![record]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(anyhow::anyhow!("Record {} is not an object: {}", index, other)),
            })
            .collect(),
        other => Err(anyhow::anyhow!("Expected a record or an array of records, got {}", other)),
    }
}

pub fn read_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    records_from_value(read_document(path)?)
}

pub fn load_models(path: &Path) -> anyhow::Result<StaticModelRegistry> {
    StaticModelRegistry::load_file(path).with_context(|| format!("Failed to load models from {}", path.display()))
}
