//! `srr replace`: merge CLI flags over config, run, and render progress.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::{io, path::Path};
use tracing::warn;

use crate::cli::{AppContext, ReplaceArgs};
use crate::core::engine::ProgressSink;
use crate::core::run::{RunObserver, RunOptions, RunPhase, RunSummary, execute};
use crate::infra::config::{Config, load_config};

pub fn run(args: ReplaceArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config().unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable config");
        Config::default()
    });

    let opts = build_options(args, &config, ctx);
    let reporter = CliReporter::new(ctx);

    let summary = execute(&opts, &reporter)?;
    reporter.finish(&summary);
    Ok(())
}

/// CLI flags win over config values.
fn build_options(args: ReplaceArgs, config: &Config, ctx: &AppContext) -> RunOptions {
    let mut ignore_patterns = config.ignore_patterns.clone();
    ignore_patterns.extend(args.ignore);

    RunOptions {
        target_dir: args.dir,
        extension: args.ext,
        keys: args.keys,
        from: args.from,
        to: args.to,
        mode: args.mode.unwrap_or(config.mode),
        staging_dir: args
            .staging_dir
            .unwrap_or_else(|| config.staging_dir.clone()),
        chunk_size: args.chunk_size.unwrap_or(config.chunk_size),
        batch_size: args.batch_size.unwrap_or(config.batch_size),
        ignore_patterns,
        respect_gitignore: args.gitignore || config.respect_gitignore,
        dry_run: ctx.dry_run,
    }
}

/// Rounded percentage; an empty run counts as complete.
fn percent(done: u64, total: u64) -> String {
    if total == 0 {
        return "100%".to_string();
    }
    format!("{}%", (done as f64 / total as f64 * 100.0).round() as u64)
}

/// Progress bar plus one-line status messages.
struct CliReporter {
    bar: ProgressBar,
    quiet: bool,
    color: bool,
}

impl CliReporter {
    fn new(ctx: &AppContext) -> Self {
        let bar = if ctx.quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
            );
            pb
        };

        Self {
            bar,
            quiet: ctx.quiet,
            color: !ctx.no_color && std::env::var_os("NO_COLOR").is_none(),
        }
    }

    fn line(&self, mark: &str, msg: &str, painted: impl FnOnce(&str) -> String) {
        if self.quiet {
            return;
        }
        let text = if self.color {
            format!("{} {}", painted(mark), msg)
        } else {
            format!("{mark} {msg}")
        };
        self.bar.suspend(|| println!("{text}"));
    }

    fn success(&self, msg: &str) {
        self.line("✓", msg, |m| m.green().to_string());
    }

    fn info(&self, msg: &str) {
        self.line("ℹ", msg, |m| m.blue().to_string());
    }

    fn warning(&self, msg: &str) {
        self.line("⚠", msg, |m| m.yellow().to_string());
    }

    fn finish(&self, summary: &RunSummary) {
        if summary.dry_run {
            self.info(&format!(
                "Dry run: {} of {} files would change; originals untouched.",
                summary.changed, summary.files
            ));
        } else {
            self.success(&format!(
                "All conversions succeeded. {} of {} files changed.",
                summary.changed, summary.files
            ));
        }
    }
}

impl ProgressSink for CliReporter {
    fn advance(&self, completed: u64, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(completed);
        self.bar.set_message(percent(completed, total));
    }
}

impl RunObserver for CliReporter {
    fn on_phase(&self, phase: RunPhase) {
        match phase {
            RunPhase::Cleaning => self.bar.finish_and_clear(),
            _ => {}
        }
    }

    fn on_staging_ready(&self, root: &Path) {
        self.success(&format!("Staging created at {}", root.display()));
    }

    fn on_scanned(&self, files: usize) {
        self.info(&format!("{files} files found."));
    }

    fn on_staging_cleared(&self, root: &Path, error: Option<&io::Error>) {
        let msg = cleanup_message(root, error);
        match error {
            None => self.success(&msg),
            Some(_) => self.warning(&msg),
        }
    }
}

fn cleanup_message(root: &Path, error: Option<&io::Error>) -> String {
    match error {
        None => "Staging cleared".to_string(),
        Some(e) => format!("Could not clear staging at {}: {e}", root.display()),
    }
}
