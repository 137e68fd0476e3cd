//! # Codemap CLI (`codemap`)
//!
//! The `codemap` binary drives a code-search backend from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! codemap --config ./config/codemap.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `codemap import <source>` | Ingest a repository and print its stats |
//! | `codemap shell` | Interactive session: import, search, browse, clear |
//! | `codemap completions <shell>` | Print shell completions |
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `warn`).

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use codemap::client::HttpBackend;
use codemap::config::{self, Config};
use codemap::{render, shell};
use codemap_core::session::Session;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Codemap: search a codebase and browse the hits as a tree.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Without one, a backend on `http://127.0.0.1:8000` is assumed.
#[derive(Parser)]
#[command(
    name = "codemap",
    about = "Search a codebase and browse the hits as a codemap",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/codemap.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a repository (local path or git URL) and print the stats.
    Import {
        /// Local directory or git URL as the backend understands it.
        source: String,
    },

    /// Start an interactive session reading commands from stdin.
    ///
    /// Type `help` inside the shell for the command list.
    Shell,

    /// Print shell completions to stdout.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file if there is one, otherwise fall back to localhost.
fn resolve_config(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Ok(Config::minimal())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Commands that don't require config
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "codemap", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = resolve_config(&cli.config)?;
    let session = Session::new(HttpBackend::new(&cfg.backend)?);

    match cli.command {
        Commands::Import { source } => {
            let stats = session.import(&source).await?;
            print!("{}", render::render_ingest_stats(&stats));
        }
        Commands::Shell => {
            let interactive = atty::is(atty::Stream::Stdin);
            if interactive {
                println!(
                    "codemap {} connected to {}. Type 'help' for commands.",
                    env!("CARGO_PKG_VERSION"),
                    session.backend().base_url()
                );
            }
            let stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            shell::run_shell(&session, &cfg.render, stdin, &mut stdout, interactive).await?;
            stdout.flush()?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
