mod cli;
mod commands;
mod file_store;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use categorizer_core::{CategorizerConfig, CategoryStore};
use clap::Parser;
use tracing::{debug, info};

use crate::file_store::FileStore;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

#[tracing::instrument]
async fn run() -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse();
    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(verbose = cli.verbose, quiet = cli.quiet, "starting categorizer CLI");

    let cfg = load_config(cli.config.as_deref())?;
    let data_path = resolve_data_path(cli.data.as_deref())?;

    let backend =
        FileStore::open(&data_path).with_context(|| format!("failed to open store at {}", data_path.display()))?;
    debug!(file = %backend.path().display(), "using file store");
    let store = CategoryStore::new(backend, &cfg.storage).with_defaults(cfg.default_categories());

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    commands::dispatch(&store, cli.command, stdin.lock(), &mut stdout).await?;

    info!("done");
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<CategorizerConfig> {
    let Some(path) = path else {
        return Ok(CategorizerConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    CategorizerConfig::from_toml_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn resolve_data_path(override_path: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }
    let dir = dirs::data_dir().ok_or_else(|| anyhow!("cannot determine data directory"))?;
    Ok(dir.join("categorizer").join("store.json"))
}
