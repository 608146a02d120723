use clap::{Parser, Subcommand, ValueEnum};
use landed_domain::{LoadPattern, StorageScope};

#[derive(Debug, Parser)]
#[command(
    name = "landed",
    about = "Config-driven Bronze/Silver medallion pipeline runner",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract source records into a raw Bronze partition.
    Bronze(RunArgs),

    /// Curate a Bronze partition into a Silver dataset.
    Silver(RunArgs),
}

#[derive(Debug, Clone, Parser)]
pub struct RunArgs {
    /// One or more configuration document paths, comma-separated (§6).
    pub config: String,

    /// ISO run date; defaults to today.
    #[arg(long)]
    pub run_date: Option<chrono::NaiveDate>,

    /// Overrides the load pattern declared in the configuration document.
    #[arg(long, value_enum)]
    pub load_pattern: Option<LoadPatternArg>,

    /// Run the policy gate only; no extraction or writes.
    #[arg(long)]
    pub validate_only: bool,

    /// Plan the run and probe adapters/backends without writing chunks.
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose logging (debug level), unless RUST_LOG is already set.
    #[arg(long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet logging (errors only), unless RUST_LOG is already set.
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// How many configuration entries to run concurrently.
    #[arg(long, default_value_t = 1)]
    pub parallel_workers: usize,

    /// Overrides every loaded config's `storage.scope` gate.
    #[arg(long, value_enum)]
    pub storage_scope: Option<StorageScopeArg>,

    /// Prefix prepended to every computed partition path.
    #[arg(long)]
    pub storage_prefix: Option<String>,

    /// Backend kinds allowed for an onprem-scoped run, comma-separated.
    #[arg(long, default_value = "local")]
    pub onprem_allow_list: String,

    /// Webhook URL to receive lifecycle events alongside the tracing sink.
    #[arg(long)]
    pub hook_url: Option<String>,

    /// Bucket count override for Silver's external-sort pass.
    #[arg(long)]
    pub bucket_count: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LoadPatternArg {
    Full,
    Cdc,
    CurrentHistory,
}

impl From<LoadPatternArg> for LoadPattern {
    fn from(value: LoadPatternArg) -> Self {
        match value {
            LoadPatternArg::Full => LoadPattern::Full,
            LoadPatternArg::Cdc => LoadPattern::Cdc,
            LoadPatternArg::CurrentHistory => LoadPattern::CurrentHistory,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StorageScopeArg {
    Onprem,
    Cloud,
}

impl From<StorageScopeArg> for StorageScope {
    fn from(value: StorageScopeArg) -> Self {
        match value {
            StorageScopeArg::Onprem => StorageScope::Onprem,
            StorageScopeArg::Cloud => StorageScope::Cloud,
        }
    }
}
