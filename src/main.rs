//! journal-sync CLI entry point.

use clap::Parser;
use jsync::cli::commands;
use jsync::cli::{Cli, Commands};
use jsync::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let db = cli.db.as_ref();
    let actor = cli.actor.as_deref();

    match &cli.command {
        Commands::Init { force } => commands::init::execute(db, &cli.tree, *force, json),
        Commands::Version => commands::version::execute(json),

        // Sync
        Commands::Tree => commands::sync::tree(db, &cli.tree, json),
        Commands::Plan => commands::sync::plan(db, &cli.tree, json),
        Commands::Sync { direction, dry_run } => {
            commands::sync::sync(db, &cli.tree, *direction, *dry_run, json)
        }

        // Host-side data
        Commands::Folder { command } => commands::folder::execute(command, db, actor, json),
        Commands::Record { command } => commands::record::execute(command, db, actor, json),

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
