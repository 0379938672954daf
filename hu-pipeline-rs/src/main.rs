// hu-pipeline-rs/src/main.rs
// Command-line entry point: runs pipeline operations for one project whose
// credentials come from the environment (REFINERY_* variables or .env)

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use connector_sdk::config::{AzureDevOpsConfig, EnvConfigProvider, LlmConfig, XrayConfig};
use connector_sdk::openrouter::OpenRouterClient;
use connector_sdk::ConfigProviderExt;
use dotenv::dotenv;
use serde::Serialize;
use tracing::info;

use hu_pipeline::models::{Language, Project, TestSystemCredentials, TrackerCredentials};
use hu_pipeline::{
    init_logging, HttpConnectorFactory, InMemoryProjectStore, InMemoryTicketStore, LoggingConfig,
    OperationResult, PipelineCoordinator, PipelineSettings, ProjectStore,
};

const ENV_PREFIX: &str = "REFINERY";
const CLI_OWNER: &str = "cli";

#[derive(Parser, Debug)]
#[command(
    name = "hu-pipeline",
    about = "Refine tracker tickets and import their generated tests"
)]
struct Cli {
    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch and refine a ticket
    Refine {
        tracker_id: String,
        #[arg(default_value = "es")]
        language: Language,
    },
    /// Refine a ticket and push the result back to the tracker
    Approve {
        tracker_id: String,
        #[arg(default_value = "es")]
        language: Language,
    },
    /// Refine and approve a ticket, then generate and import its test suite
    Run {
        tracker_id: String,
        /// Folder in the test repository, e.g. "DEUN/Login"
        target_path: String,
        #[arg(default_value = "es")]
        language: Language,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    init_logging(Some(LoggingConfig {
        json_format: cli.json_logs,
        ..LoggingConfig::default()
    }))?;

    let config = EnvConfigProvider::new().with_prefix(ENV_PREFIX);
    let pipeline = build_pipeline(&config).await?;

    match cli.command {
        Commands::Refine {
            tracker_id,
            language,
        } => {
            let outcome = pipeline.create_ticket(&tracker_id, language).await;
            print_report(&outcome)?;
        }
        Commands::Approve {
            tracker_id,
            language,
        } => {
            let created = pipeline.create_ticket(&tracker_id, language).await;
            match created.value() {
                Some(ticket) => {
                    let outcome = pipeline.approve(ticket.id).await;
                    print_report(&outcome)?;
                }
                None => print_report(&created)?,
            }
        }
        Commands::Run {
            tracker_id,
            target_path,
            language,
        } => {
            let created = pipeline.create_ticket(&tracker_id, language).await;
            let Some(ticket) = created.value() else {
                return print_report(&created);
            };

            // A failed tracker sync still leaves the ticket accepted
            let approved = pipeline.approve(ticket.id).await;
            if approved.is_failure() {
                return print_report(&approved);
            }

            let outcome = pipeline
                .generate_and_upload_tests(ticket.id, &target_path)
                .await;
            print_report(&outcome)?;
        }
    }

    Ok(())
}

/// Coordinator for a single active project assembled from the environment
async fn build_pipeline(config: &EnvConfigProvider) -> Result<PipelineCoordinator> {
    let tracker = AzureDevOpsConfig::from_provider(config).context("tracker configuration")?;
    let test_system = XrayConfig::from_provider(config).context("test system configuration")?;
    let llm = LlmConfig::from_provider(config).context("LLM configuration")?;

    let projects = InMemoryProjectStore::new();
    let mut project = Project::new(
        CLI_OWNER,
        config.get_string_or("project_name", &tracker.project),
        TrackerCredentials {
            token: tracker.token,
            organization: tracker.organization,
            project: tracker.project,
        },
        TestSystemCredentials {
            client_id: test_system.client_id,
            client_secret: test_system.client_secret,
        },
    );
    project.is_active = true;
    projects.insert(project).await?;

    let provider = Arc::new(OpenRouterClient::new_with_config(llm)?);
    info!(model = provider.model(), "Language model client ready");

    let pipeline = PipelineCoordinator::for_active_project(
        CLI_OWNER,
        &projects,
        Arc::new(InMemoryTicketStore::new()),
        &HttpConnectorFactory::from_provider(config),
        provider,
        &PipelineSettings::from_provider(config),
    )
    .await?;

    Ok(pipeline)
}

fn print_report<T: Serialize>(outcome: &OperationResult<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&outcome.report())?);
    if outcome.is_failure() {
        std::process::exit(1);
    }
    Ok(())
}
