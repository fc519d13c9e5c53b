use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "veil")]
#[command(about = "Mask sensitive values before text reaches an LLM, and put them back after", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "VEIL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replace sensitive values in a file with aliases
    Sanitize {
        /// Input file, or '-' for stdin
        input: String,

        /// Print the result and match ledger as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        gates: GateArgs,
    },

    /// Put original values back into an LLM response
    Restore {
        /// The unsanitized text that produced the aliases
        #[arg(long)]
        original: PathBuf,

        /// Response containing aliases, or '-' for stdin
        #[arg(long, default_value = "-")]
        response: String,

        #[command(flatten)]
        gates: GateArgs,
    },

    /// List enabled patterns, highest priority first
    Patterns {
        /// Only show patterns of this category (e.g. ip_address)
        #[arg(long)]
        category: Option<String>,
    },

    /// Show config path and effective settings
    Config,

    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

/// Per-invocation overrides of the `[sanitize]` config section
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct GateArgs {
    /// Skip PII and credential detectors (API keys, tokens, passwords,
    /// private keys, SSN, card numbers, email, phone, URLs)
    #[arg(long)]
    pub no_pii: bool,

    /// Skip infrastructure detectors (database and server names, hostnames,
    /// IPs, connection strings, file paths)
    #[arg(long)]
    pub no_infra: bool,

    /// Skip user-defined patterns
    #[arg(long)]
    pub no_custom: bool,
}
