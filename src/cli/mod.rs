pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "monk")]
#[command(about = "Monk CLI - Run observer pipelines against local model definitions")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run records through the observer pipeline")]
    Pipeline {
        #[command(subcommand)]
        cmd: commands::pipeline::PipelineCommands,
    },

    #[command(about = "Model definitions and record validation")]
    Describe {
        #[command(subcommand)]
        cmd: commands::describe::DescribeCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Pipeline { cmd } => commands::pipeline::handle(cmd, output_format).await,
        Commands::Describe { cmd } => commands::describe::handle(cmd, output_format).await,
    }
}
