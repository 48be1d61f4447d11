use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use roux::format::FormatRegistry;
use roux::store::DocStoreConfig;
use roux::DocStore;

/// Resolve the vault root from, in priority order: `--root <path>` CLI
/// argument, the `ROUX_ROOT` environment variable, or the current working
/// directory. Paths are tilde-expanded and canonicalized.
fn resolve_root() -> PathBuf {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|a| a == "--root") {
        if let Some(path_str) = args.get(pos + 1) {
            if let Some(path) = expand_and_canonicalize(path_str) {
                return path;
            }
        }
    }

    if let Ok(path_str) = env::var("ROUX_ROOT") {
        if let Some(path) = expand_and_canonicalize(&path_str) {
            return path;
        }
    }

    let current = env::current_dir().unwrap_or_else(|e| {
        eprintln!("warning: could not determine current directory: {e}");
        PathBuf::from(".")
    });
    current.canonicalize().unwrap_or(current)
}

fn expand_and_canonicalize(raw: &str) -> Option<PathBuf> {
    let expanded = shellexpand::tilde(raw).to_string();
    let path = PathBuf::from(expanded);
    if !path.exists() {
        eprintln!("warning: path does not exist: {}", path.display());
        return None;
    }
    Some(path.canonicalize().unwrap_or(path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let root = resolve_root();
    let cache_dir = root.join(".roux");
    let logs_dir = cache_dir.join("logs");
    tokio::fs::create_dir_all(&logs_dir)
        .await
        .unwrap_or_else(|e| eprintln!("failed to create logs dir at {}: {e}", logs_dir.display()));

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("roux=info"))?;
    let file_appender = rolling::daily(&logs_dir, "roux.log");
    let (non_blocking_file, _file_guard) = non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    info!(root = %root.display(), "starting roux");

    let config = DocStoreConfig::new(&root, &cache_dir);
    let store = Arc::new(DocStore::new(config, FormatRegistry::with_defaults(), None)?);

    let report = store.sync().await?;
    info!(
        upserted = report.upserted,
        removed = report.removed,
        duplicate_ids = report.duplicate_ids.len(),
        "initial sync complete"
    );

    store.start_watching().await?;
    info!("watching for changes");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }

    info!("shutting down");
    store.close().await?;
    Ok(())
}
