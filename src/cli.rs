//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for simchat.

use clap::{Parser, Subcommand};

/// simchat - LLM chat front-end and conversation simulation harness
///
/// Serves a thin web chat UI over a hosted completion API, simulates
/// agent-to-agent conversations between persona and service agents,
/// persists transcripts, and judges them after the fact.
#[derive(Parser, Debug)]
#[command(name = "simchat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, env = "SIMCHAT_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (chat UI plus simulation endpoints)
    Serve {
        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Simulate a single conversation between two agents
    Simulate {
        /// User persona profile (e.g. frustrated-customer)
        #[arg(long, default_value = "frustrated-customer")]
        persona: String,

        /// Service profile (e.g. support-rep)
        #[arg(long, default_value = "support-rep")]
        service: String,

        /// Number of rounds (overrides the configured default)
        #[arg(short, long)]
        max_turns: Option<usize>,

        /// Print turns to stdout as they happen
        #[arg(long)]
        show_turns: bool,
    },

    /// Run a batch of simulations over the bundled persona catalog
    Batch {
        /// Conversations per persona/service pair
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Number of rounds per conversation
        #[arg(short, long)]
        max_turns: Option<usize>,
    },

    /// Judge a persisted conversation transcript
    Judge {
        /// Path to the transcript JSON file
        transcript: String,

        /// Use a mixture of judge agents instead of a single pass
        #[arg(long)]
        mixture: bool,

        /// Write the verdict JSON to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Profile management
    Profile {
        #[command(subcommand)]
        subcommand: ProfileSubcommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Display version and build information
    Version,
}

/// Profile subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ProfileSubcommand {
    /// List all bundled persona and service profiles
    List,

    /// Show the full definition of a profile
    Show {
        /// Profile name (e.g. frustrated-customer)
        profile: String,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show,

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate,
}
