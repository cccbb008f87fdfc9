use clap::Parser;
use owo_colors::OwoColorize;
use scoped_replace::cli::{AppContext, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    let result = match cli.command {
        Commands::Replace(args) => scoped_replace::replace_run(args, &ctx),
        Commands::Init(args) => scoped_replace::infra::config_init(args, &ctx),
        Commands::Completions(args) => scoped_replace::completion::run(args),
    };

    if let Err(e) = result {
        if ctx.no_color {
            eprintln!("✗ {e:#}");
        } else {
            eprintln!("{} {}", "✗".red().bold(), format!("{e:#}").red().bold());
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
