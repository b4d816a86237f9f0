//! simchat - LLM chat front-end and conversation simulation harness
//!
//! This is the main entry point for the simchat binary. It serves a thin
//! web chat UI over a hosted completion API, simulates agent-to-agent
//! conversations between persona and service profiles, persists the
//! transcripts, and judges them after the fact.

mod agent;
mod batch;
mod cli;
mod config;
mod conversation;
mod error;
mod judge;
mod llm;
mod logging;
mod profile;
mod server;
mod store;
mod version;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::agent::Agent;
use crate::batch::BatchRunner;
use crate::cli::{Cli, Commands, ConfigSubcommand, ProfileSubcommand};
use crate::config::SimchatConfig;
use crate::conversation::{Orchestrator, OrchestratorConfig, TerminatedReason};
use crate::error::{Error, Result};
use crate::judge::{Judge, JudgeMode};
use crate::llm::{ApiClient, SharedClient};
use crate::profile::{AgentRole, ProfileRegistry};
use crate::server::AppState;
use crate::store::TranscriptStore;

fn main() {
    if let Err(e) = run() {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    // Commands that don't need full logging or a loaded config
    match &cli.command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(subcommand.clone(), cli.config.as_deref());
        }
        Commands::Profile { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_profile_command(subcommand.clone());
        }
        _ => {}
    }

    let config = SimchatConfig::load(cli.config.as_deref())?;

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    info!(
        version = %build.full_version(),
        target = %build.target,
        profile = %build.profile,
        "Starting simchat"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(num_cpus::get().min(8))
        .thread_name("simchat")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    match cli.command {
        Commands::Serve { port } => runtime.block_on(run_server(config, port)),
        Commands::Simulate {
            persona,
            service,
            max_turns,
            show_turns,
        } => runtime.block_on(run_simulate(config, &persona, &service, max_turns, show_turns)),
        Commands::Batch { count, max_turns } => {
            runtime.block_on(run_batch(config, count, max_turns))
        }
        Commands::Judge {
            transcript,
            mixture,
            output,
        } => runtime.block_on(run_judge(config, &transcript, mixture, output.as_deref())),
        Commands::Version | Commands::Config { .. } | Commands::Profile { .. } => {
            // Already handled above
            unreachable!();
        }
    }
}

/// Build the shared completion client from the loaded configuration.
fn build_client(config: &SimchatConfig) -> Result<SharedClient> {
    Ok(Arc::new(ApiClient::new(config.llm.clone())?))
}

/// Judge model override, when configured differently from the chat model.
fn judge_model(config: &SimchatConfig) -> Option<String> {
    let model = config.judge_model();
    if model.is_empty() || model == config.llm.model {
        None
    } else {
        Some(model.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────

/// Start the HTTP server.
async fn run_server(config: SimchatConfig, port: Option<u16>) -> Result<()> {
    let client = build_client(&config)?;
    let registry = ProfileRegistry::new()?;
    let store = TranscriptStore::new(config.transcript_dir());

    server::serve(
        AppState {
            client,
            registry,
            config,
            store,
        },
        port,
    )
    .await
}

/// Run one simulated conversation and persist the transcript.
async fn run_simulate(
    config: SimchatConfig,
    persona: &str,
    service: &str,
    max_turns: Option<usize>,
    show_turns: bool,
) -> Result<()> {
    let client = build_client(&config)?;
    let registry = ProfileRegistry::new()?;
    let store = TranscriptStore::new(config.transcript_dir());

    let persona_profile = registry.resolve_role(persona, AgentRole::UserPersona)?;
    let service_profile = registry.resolve_role(service, AgentRole::Service)?;

    let persona_agent = Agent::new(persona_profile.clone(), client.clone());
    let service_agent = Agent::new(service_profile.clone(), client);

    let orchestrator_config = OrchestratorConfig::from_settings(&config.conversation, max_turns);
    let mut orchestrator = Orchestrator::new(persona_agent, service_agent, orchestrator_config)?;
    if show_turns {
        orchestrator = orchestrator.with_observer(Box::new(|turn| {
            println!("[{}] {}", turn.speaker, turn.text);
        }));
    }

    let conversation = orchestrator.run().await?;
    let path = store.save(&conversation)?;

    println!(
        "Conversation finished: {} turns, saved to {}",
        conversation.turn_count(),
        path.display()
    );

    // The partial transcript is already on disk; surface the failure
    if let TerminatedReason::Error {
        speaker,
        turn_index,
        message,
    } = conversation.terminated_reason
    {
        return Err(Error::agent_call(
            speaker,
            turn_index,
            Error::Internal(message),
        ));
    }

    Ok(())
}

/// Run the persona catalog `count` times.
async fn run_batch(config: SimchatConfig, count: usize, max_turns: Option<usize>) -> Result<()> {
    let client = build_client(&config)?;
    let registry = ProfileRegistry::new()?;
    let store = TranscriptStore::new(config.transcript_dir());

    let runner = BatchRunner::new(&registry, client, config.conversation.clone(), store);

    for sweep in 1..=count.max(1) {
        let report = runner.run(None, max_turns).await?;

        println!(
            "Batch {}/{}: {}/{} conversations succeeded, {} turns, saved under {}",
            sweep,
            count.max(1),
            report.successful_runs,
            report.total_runs,
            report.total_turns,
            report.batch_folder
        );
        for item in &report.results {
            let status = if item.success { "ok" } else { "FAILED" };
            println!(
                "  {:<22} vs {:<14} {:>6}  {}",
                item.profile.slug(),
                item.service.slug(),
                status,
                item.message
            );
        }
    }

    Ok(())
}

/// Judge a persisted transcript and print (or write) the verdict.
async fn run_judge(
    config: SimchatConfig,
    transcript: &str,
    mixture: bool,
    output: Option<&str>,
) -> Result<()> {
    let client = build_client(&config)?;
    let store = TranscriptStore::new(config.transcript_dir());

    let path = std::path::Path::new(transcript);
    let conversation = store.load(path)?;

    let judge = Judge::new(client, judge_model(&config), config.judge.max_concurrency);
    let verdict = judge.analyze(&conversation, mixture).await?;

    let json = serde_json::to_string_pretty(&verdict)
        .map_err(|e| Error::Internal(format!("Failed to serialize verdict: {}", e)))?;

    match output {
        Some(out) => {
            let out_path = std::path::Path::new(out);
            std::fs::write(out_path, &json).map_err(|e| Error::IoWrite {
                path: out_path.to_path_buf(),
                source: e,
            })?;
            println!("Verdict written to {}", out);
        }
        None => println!("{}", json),
    }

    // A clean sweep of failed judge passes is an error exit
    if let JudgeMode::Mixture { ref summary, .. } = verdict.mode {
        if summary.successful_agents == 0 {
            return Err(Error::AllJudgesFailed {
                count: summary.total_agents,
                errors: summary.errors.clone(),
            });
        }
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Profile / Config Commands
// ─────────────────────────────────────────────────────────────────

fn handle_profile_command(subcommand: ProfileSubcommand) -> Result<()> {
    let registry = ProfileRegistry::new()?;

    match subcommand {
        ProfileSubcommand::List => {
            println!("{:<22} {:<14} DESCRIPTION", "NAME", "ROLE");
            for profile in registry.list() {
                println!(
                    "{:<22} {:<14} {}",
                    profile.name.slug(),
                    profile.role.slug(),
                    profile.description
                );
            }
            Ok(())
        }
        ProfileSubcommand::Show { profile } => {
            let profile = registry.resolve(&profile)?;
            println!("Name:        {}", profile.name.slug());
            println!("Role:        {}", profile.role.slug());
            println!("Description: {}", profile.description);
            println!();
            println!("System prompt:");
            println!("{}", profile.system_prompt());
            Ok(())
        }
    }
}

fn handle_config_command(subcommand: ConfigSubcommand, config_path: Option<&str>) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            let config = SimchatConfig::load(config_path)?;
            let toml_str = toml::to_string_pretty(&config)
                .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
            println!("# Current simchat configuration");
            println!("{}", toml_str);
            Ok(())
        }
        ConfigSubcommand::Init { path, force } => config::init_config(path.as_deref(), force),
        ConfigSubcommand::Validate => config::validate_config(config_path),
    }
}
