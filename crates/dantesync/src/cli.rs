//! Clap derive structures for the `dantesync` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// dantesync -- inspect and route Dante audio domains
#[derive(Debug, Parser)]
#[command(
    name = "dantesync",
    version,
    about = "Inspect and route Dante audio domains from the command line",
    long_about = "Keeps a snapshot of a Dante domain in sync over the domain GraphQL API\n\
        and applies rx channel subscriptions with batch verification and retry.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config profile to use
    #[arg(long, short = 'p', env = "DANTESYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// GraphQL endpoint URL (overrides profile)
    #[arg(long, env = "DANTESYNC_API_HOST", global = true)]
    pub api_host: Option<String>,

    /// Domain API key
    #[arg(long, env = "DANTESYNC_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Domain id to sync (overrides profile)
    #[arg(long, short = 'd', env = "DANTESYNC_DOMAIN", global = true)]
    pub domain: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DANTESYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "DANTESYNC_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "DANTESYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List domains visible to the API key
    Domains,

    /// List devices in the domain with channel counts
    #[command(alias = "dev")]
    Devices,

    /// Show rx routing of one device
    Routes(RoutesArgs),

    /// Apply rx subscriptions to one device with verification and retry
    Apply(ApplyArgs),

    /// Force a full fetch and print a summary
    Refresh,

    /// Poll the domain and print status and definition changes until Ctrl-C
    Watch(WatchArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Routing ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RoutesArgs {
    /// Device id or name
    pub device: String,

    /// Print the routing as mapping text instead of a table
    #[arg(long)]
    pub learn: bool,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Receiving device id or name
    pub device: String,

    /// Mapping text, e.g. "Rx1=Out1@DevA; Rx2=; Rx3=ignore"
    #[arg(long, short = 'm')]
    pub mappings: Option<String>,

    /// Single entry as RX=SOURCE, where RX is an rx name or index (repeatable)
    #[arg(long = "set", value_name = "RX=SOURCE")]
    pub set: Vec<String>,

    /// Maximum rx entries per mutation (overrides profile)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Verify/re-apply rounds after the first attempt (overrides profile)
    #[arg(long)]
    pub retries: Option<u32>,
}

impl ApplyArgs {
    /// Combined mapping text from `--mappings` and every `--set`.
    pub fn mapping_text(&self) -> Option<String> {
        let entries: Vec<&str> = self
            .mappings
            .as_deref()
            .into_iter()
            .chain(self.set.iter().map(String::as_str))
            .collect();
        (!entries.is_empty()).then(|| entries.join("; "))
    }
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval, e.g. "10s" (overrides profile)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (secrets masked)
    Show,
    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
