use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::engine::DEFAULT_CHUNK_SIZE;
use crate::core::pattern::{DEFAULT_BATCH_SIZE, KeyMode};
use crate::core::run::DEFAULT_STAGING_DIR;

/// File name written by `srr init`
pub const CONFIG_FILE: &str = "scoped-replace.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Staging directory (relative to the working directory unless absolute)
    pub staging_dir: PathBuf,

    /// Files converted concurrently per chunk
    pub chunk_size: usize,

    /// Maximum keys compiled into one matcher
    pub batch_size: usize,

    /// Default key interpretation
    pub mode: KeyMode,

    /// Extra ignore globs, relative to the target directory
    pub ignore_patterns: Vec<String>,

    /// Honor .gitignore while scanning
    pub respect_gitignore: bool,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            mode: KeyMode::Pattern,
            ignore_patterns: Vec::new(),
            respect_gitignore: false,
        }
    }
}

pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

/// Load from the first config file found in `dir`, then `SRR_*` env vars.
pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    let config_paths = [
        CONFIG_FILE,
        "scoped-replace.yaml",
        "scoped-replace.json",
        ".scoped-replace.toml",
    ];

    for name in &config_paths
    {
        let path = dir.join(name);
        if path.exists()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    // Add environment variables with SRR_ prefix
    builder = builder.add_source(
        config::Environment::with_prefix("SRR")
            .prefix_separator("_")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILE);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
