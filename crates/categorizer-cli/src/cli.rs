use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "categorizer",
    version,
    about = "Preview and edit project categories outside the browser"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// JSON file holding the persisted records.
    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    /// TOML config with the same schema the content script embeds.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the category each title would be filed under.
    Classify {
        #[arg(required = true)]
        titles: Vec<String>,
    },
    /// Count titles read from stdin, one per line. A blank line stands for a
    /// project without a title.
    Counts {
        #[arg(long = "filter")]
        filter: Option<String>,
    },
    #[command(subcommand)]
    Categories(CategoriesCommand),
    /// Print the active filter, or set it when NAME is given.
    Filter { name: Option<String> },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoriesCommand {
    List,
    /// Add a category or replace its keywords.
    Put {
        name: String,
        /// Comma-separated keywords.
        #[arg(long = "keywords", default_value = "")]
        keywords: String,
    },
    Remove {
        name: String,
    },
    /// Overwrite the stored map with the defaults.
    Reset,
}

#[tracing::instrument]
pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
