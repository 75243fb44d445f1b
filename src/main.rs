//! Quiver CLI - AI-driven API test case generation

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use quiver::agent::LlmAgent;
use quiver::error::{FixSuggestion, QuiverError};
use quiver::orchestrator::{Orchestrator, Stage};
use quiver::prompts;
use quiver::provider::{create_provider, Provider};
use quiver::spec::SpecAcquirer;

#[derive(Parser)]
#[command(name = "quiver")]
#[command(about = "Quiver - AI-driven API test case generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract endpoint records from an API's OpenAPI documentation
    Extract {
        /// Base URL of the API documentation
        url: String,

        /// Restrict extraction to these paths
        #[arg(short, long, num_args = 1..)]
        endpoints: Option<Vec<String>>,

        /// Skip direct spec probing (scraping fallback only)
        #[arg(long)]
        no_direct: bool,
    },

    /// Generate test cases for an API via the agent pipeline
    Generate {
        /// Base URL of the API documentation
        url: String,

        /// Provider to use (openai, mock)
        #[arg(short, long, default_value = "openai")]
        provider: String,

        /// Override the provider's default model
        #[arg(short, long)]
        model: Option<String>,

        /// Directory for the exported results file
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Restrict generation to these paths
        #[arg(short, long, num_args = 1..)]
        endpoints: Option<Vec<String>>,
    },

    /// Liveness check
    Ping,
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            url,
            endpoints,
            no_direct,
        } => extract(&url, endpoints.as_deref(), !no_direct).await,
        Commands::Generate {
            url,
            provider,
            model,
            output_dir,
            endpoints,
        } => generate(&url, &provider, model, &output_dir, endpoints.as_deref()).await,
        Commands::Ping => {
            info!("Pong");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

async fn extract(
    url: &str,
    endpoint_filter: Option<&[String]>,
    try_direct: bool,
) -> Result<(), QuiverError> {
    info!(url, "Extracting specs");

    let acquirer = SpecAcquirer::new();
    let endpoints = acquirer.acquire(url, endpoint_filter, try_direct).await?;

    println!(
        "{} {} endpoint(s) extracted",
        "✓".green(),
        endpoints.len()
    );
    println!("{}", serde_json::to_string_pretty(&endpoints)?);
    Ok(())
}

async fn generate(
    url: &str,
    provider_name: &str,
    model_override: Option<String>,
    output_dir: &std::path::Path,
    endpoint_filter: Option<&[String]>,
) -> Result<(), QuiverError> {
    let provider: Arc<dyn Provider> = Arc::from(
        create_provider(provider_name).map_err(|e| QuiverError::Provider(e.to_string()))?,
    );
    let model = model_override.unwrap_or_default();
    println!(
        "{} Using provider: {} | model: {}",
        "→".cyan(),
        provider.name().cyan().bold(),
        if model.is_empty() { "(default)" } else { &model }.cyan()
    );

    let acquirer = SpecAcquirer::new();
    let endpoints = acquirer.acquire(url, endpoint_filter, true).await?;
    println!(
        "{} {} endpoint(s) extracted from {}",
        "→".cyan(),
        endpoints.len(),
        url.cyan()
    );

    let spec_prompt = format!(
        "{}{}",
        prompts::PERSONA_TASK_PREFIX,
        serde_json::to_string(&endpoints)?
    );
    let stages = vec![
        Stage::new(
            Arc::new(LlmAgent::new(
                "user_modelling_agent",
                prompts::PERSONA_MODELLING_PROMPT,
                Arc::clone(&provider),
                model.clone(),
            )),
            spec_prompt,
        ),
        Stage::new(
            Arc::new(LlmAgent::new(
                "test_case_family_agent",
                prompts::TEST_FAMILY_PROMPT,
                Arc::clone(&provider),
                model.clone(),
            )),
            prompts::FAMILY_TASK_PREFIX,
        ),
        Stage::new(
            Arc::new(LlmAgent::new(
                "test_case_generator_agent",
                prompts::TEST_GENERATOR_PROMPT,
                Arc::clone(&provider),
                model,
            )),
            prompts::GENERATOR_TASK_PREFIX,
        ),
    ];

    let mut orchestrator = Orchestrator::new(stages);
    orchestrator.run_parallel().await;

    let path = orchestrator.export_results(output_dir)?;
    println!(
        "{} Results exported to {}",
        "✓".green(),
        path.display().to_string().bold()
    );

    let failures = orchestrator.failure_summary();
    if !failures.is_empty() {
        println!(
            "{} {} task(s) failed:",
            "!".yellow().bold(),
            failures.len()
        );
        for failure in &failures {
            println!(
                "  {} {} [{}]: {}",
                "✗".red(),
                failure.stage,
                failure.key,
                failure.msg
            );
        }
    }

    Ok(())
}
