use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::utils::{load_models, output_error, output_success, output_violations, read_records};
use crate::cli::OutputFormat;
use crate::model::ModelRegistry;
use crate::observer::error::{codes, ValidationError};
use crate::validation::{schema_validator, validate_record};

#[derive(Subcommand)]
pub enum DescribeCommands {
    #[command(about = "List all models in a definitions file")]
    List {
        #[arg(long, help = "Model definitions file")]
        models: PathBuf,
    },

    #[command(about = "Show model fields")]
    Fields {
        #[arg(long, help = "Model definitions file")]
        models: PathBuf,
        #[arg(help = "Model name")]
        model: String,
    },

    #[command(about = "Validate records against a model without persisting")]
    Validate {
        #[arg(long, help = "Model definitions file")]
        models: PathBuf,
        #[arg(long, help = "Model name")]
        model: String,
        #[arg(help = "Records file (a record or an array of records)")]
        records: PathBuf,
    },
}

pub async fn handle(cmd: DescribeCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DescribeCommands::List { models } => {
            let registry = load_models(&models)?;
            let names = registry.names();
            match output_format {
                OutputFormat::Json => output_success(&output_format, "Models loaded", Some(json!({ "models": names }))),
                OutputFormat::Text => {
                    for name in names {
                        println!("{}", name);
                    }
                    Ok(())
                }
            }
        }
        DescribeCommands::Fields { models, model } => {
            let registry = load_models(&models)?;
            let Some(model) = registry.resolve(&model).await else {
                output_error(&output_format, &format!("Model '{}' not found", model), Some("MODEL_NOT_FOUND"))?;
                return Err(anyhow::anyhow!("Model '{}' not found", model));
            };

            let fields: Vec<_> = model
                .fields
                .values()
                .map(|field| {
                    json!({
                        "name": field.name,
                        "type": field.type_label(),
                        "required": model.is_required(&field.name),
                        "minimum": field.minimum,
                        "maximum": field.maximum,
                        "pattern": field.pattern.as_ref().map(|p| p.as_str()),
                        "enum": field.enum_values,
                        "description": field.description,
                    })
                })
                .collect();

            match output_format {
                OutputFormat::Json => {
                    output_success(&output_format, &format!("Model {}", model.name), Some(json!({ "fields": fields })))
                }
                OutputFormat::Text => {
                    for field in model.fields.values() {
                        let marker = if model.is_required(&field.name) { "*" } else { " " };
                        println!("{} {:<24} {}", marker, field.name, field.type_label());
                    }
                    Ok(())
                }
            }
        }
        DescribeCommands::Validate { models, model, records } => {
            let registry = load_models(&models)?;
            let Some(model) = registry.resolve(&model).await else {
                output_error(&output_format, &format!("Model '{}' not found", model), Some("MODEL_NOT_FOUND"))?;
                return Err(anyhow::anyhow!("Model '{}' not found", model));
            };
            let records = read_records(&records)?;

            let mut violations: Vec<ValidationError> = Vec::new();
            for (index, record) in records.iter().enumerate() {
                let field_errors = validate_record(record, index, &model);
                if !field_errors.is_empty() {
                    violations.extend(field_errors);
                    continue;
                }

                let outcome = schema_validator().validate(&model, record)?;
                violations.extend(outcome.errors.into_iter().map(|v| {
                    let error = ValidationError::new(codes::SCHEMA_VALIDATION, v.message.clone())
                        .at_record(index)
                        .with_details(json!({ "path": v.path }));
                    match v.field() {
                        Some(field) => error.with_field(field),
                        None => error,
                    }
                }));
            }

            if violations.is_empty() {
                return output_success(
                    &output_format,
                    &format!("{} record(s) valid for {}", records.len(), model.name),
                    None,
                );
            }

            match output_format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "success": false, "violations": violations }))?
                ),
                OutputFormat::Text => output_violations(&violations),
            }
            Err(anyhow::anyhow!("{} violation(s) in {} record(s)", violations.len(), records.len()))
        }
    }
}
