//! docqa CLI - Command-line interface
//!
//! Usage:
//!   docqa ask <document> -q <question> [-q <question> ...]
//!   docqa ingest <document>
//!
//! Configuration comes from the same environment variables as the API
//! server (QDRANT_URL, OPENAI_API_KEY, LLM_PROVIDER, ...).

use anyhow::Context;
use clap::{Parser, Subcommand};
use docqa_core::AppConfig;
use docqa_pipeline::QaPipeline;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about a PDF document")]
#[command(version)]
struct Cli {
    /// Emit results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer questions about a document
    Ask {
        /// Document URL or local path
        document: String,

        /// Question to ask (repeatable)
        #[arg(short = 'q', long = "question", required = true)]
        questions: Vec<String>,
    },
    /// Ingest a document into the vector index without asking anything
    Ingest {
        /// Document URL or local path
        document: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa_pipeline=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = AppConfig::from_env().unwrap_or_default();
    let pipeline = QaPipeline::from_config(&config)
        .await
        .context("failed to initialize the answering pipeline")?;

    match cli.command {
        Commands::Ask {
            document,
            questions,
        } => {
            let outcomes = pipeline.answer(&document, questions).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
            } else {
                for outcome in &outcomes {
                    println!("Q: {}", outcome.question);
                    match (&outcome.answer, &outcome.error) {
                        (Some(answer), _) => println!("A: {answer}"),
                        (None, Some(error)) => println!("error: {error}"),
                        (None, None) => println!("error: no result"),
                    }
                    println!();
                }
            }
        }
        Commands::Ingest { document } => {
            pipeline.ensure_ingested(&document).await?;
            println!("ingested: {document}");
        }
    }

    Ok(())
}
