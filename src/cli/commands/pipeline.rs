use clap::Subcommand;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::cli::utils::{load_models, output_pipeline_error, output_records, read_records};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::observer::{register_builtin_observers, ObserverPipeline, ObserverRegistry, ObserverRegistryBuilder};
use crate::storage::MemoryStorage;
use crate::system::System;
use crate::types::Operation;

#[derive(Subcommand)]
pub enum PipelineCommands {
    #[command(about = "Run one operation over a batch of records using in-memory storage")]
    Run {
        #[arg(long, help = "Model definitions file (JSON or YAML, keyed by model name)")]
        models: PathBuf,
        #[arg(long, help = "Model name")]
        model: String,
        #[arg(long, help = "Operation: create, update, delete, revert or access")]
        operation: Operation,
        #[arg(long, help = "Existing rows to load before running (JSON or YAML)")]
        seed: Option<PathBuf>,
        #[arg(long, default_value = "local", help = "Tenant name")]
        tenant: String,
        #[arg(long, help = "Acting user id")]
        user: Option<Uuid>,
        #[arg(help = "Records file (a record or an array of records)")]
        records: PathBuf,
    },
}

pub async fn handle(cmd: PipelineCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PipelineCommands::Run { models, model, operation, seed, tenant, user, records } => {
            let models = load_models(&models)?;
            let records = read_records(&records)?;

            let storage = Arc::new(MemoryStorage::new());
            if let Some(seed) = seed {
                let rows = read_records(&seed)?;
                tracing::debug!("Seeding {} row(s) into {}", rows.len(), model);
                storage.seed(&model, rows).await;
            }

            let registry = ObserverRegistry::warm_up(&|builder: &mut ObserverRegistryBuilder| {
                register_builtin_observers(builder, config());
            });
            let pipeline = Arc::new(ObserverPipeline::with_registry(registry));

            let mut system = System::new(tenant, Arc::new(models), storage, pipeline);
            if let Some(user) = user {
                system = system.with_user(user);
            }
            let system = Arc::new(system);

            let count = records.len();
            match system.run_at_depth(operation, &model, records, 0).await {
                Ok(rows) => output_records(
                    &output_format,
                    &format!("{} {} record(s) in {}", operation, count, model),
                    &rows,
                ),
                Err(e) => {
                    output_pipeline_error(&output_format, &e)?;
                    Err(anyhow::anyhow!("{} on {} failed with {}", operation, model, e.code()))
                }
            }
        }
    }
}
