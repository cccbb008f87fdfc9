//! **scoped-replace** - bulk find-and-replace restricted to key matches
//!
//! Every occurrence of `from` that lies inside a key match is rewritten to `to`
//! across a directory tree. Output is staged in a mirror directory and only
//! committed onto the originals once every file converted cleanly.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Conversion pipeline - patterns, staging, engine, commit
pub mod core {
    /// Error taxonomy for fatal, per-job and aggregate failures
    pub mod error;
    pub use error::{JobError, JobStage, ReplaceError};

    /// Key batching with longest-key-first alternation
    pub mod pattern;
    pub use pattern::{KeyBatch, KeyMode, build_batches};

    /// Staging mirror tree with read-with-fallback
    pub mod staging;
    pub use staging::StagingStore;

    /// Chunked, settle-all conversion of files against key batches
    pub mod engine;
    pub use engine::{ConversionEngine, EngineReport, JobOutcome, ProgressSink, convert_content};

    /// Moves staged output onto the original tree
    pub mod commit;
    pub use commit::commit;

    /// Run orchestration: init, scan, convert, commit, cleanup
    pub mod run;
    pub use run::{RunObserver, RunOptions, RunPhase, RunSummary, Silent, execute};

    /// `srr replace` command handler (progress bar + status lines)
    pub mod replace;
    pub use replace::run as replace_run;
}

/// Infrastructure - configuration and directory walking
pub mod infra {
    /// Configuration management with TOML support
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Lazy depth-first file walker with suffix filter
    pub mod walk;
    pub use walk::{FileWalker, Walk, WalkError};
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use self::core::{ReplaceError, RunOptions, RunSummary, execute, replace_run};
pub use infra::{Config, FileWalker, load_config};
