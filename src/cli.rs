use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::pattern::KeyMode;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "srr")]
#[command(about = "Bulk find-and-replace scoped to key matches, staged and committed all-or-nothing")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Convert into staging but leave the originals untouched
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rewrite `from` to `to` inside every key match under a directory
    Replace(ReplaceArgs),

    /// Initialize a scoped-replace.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ReplaceArgs {
    /// Target directory
    #[arg(short, long, value_name = "DIR")]
    pub dir: PathBuf,

    /// Only files whose name ends with `.EXT`
    #[arg(short, long, value_name = "EXT")]
    pub ext: Option<String>,

    /// Keys to find; substitution only happens inside their matches
    #[arg(short, long, value_name = "KEY", num_args = 1.., required = true)]
    pub keys: Vec<String>,

    /// Text to replace inside each key match
    #[arg(short, long, allow_hyphen_values = true)]
    pub from: String,

    /// Replacement text
    #[arg(short, long, allow_hyphen_values = true)]
    pub to: String,

    /// How keys are interpreted (overrides config)
    #[arg(long, value_enum)]
    pub mode: Option<KeyMode>,

    /// Staging directory (overrides config)
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Files converted concurrently per chunk (overrides config)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Maximum keys per matcher (overrides config)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Additional glob patterns to ignore, relative to --dir
    #[arg(short, long)]
    pub ignore: Vec<String>,

    /// Honor .gitignore while scanning
    #[arg(long)]
    pub gitignore: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
