use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use avoda_sync_core::{Credential, RecordKind, config::Config, credential::FileCredentialStore};
use avoda_sync_pipeline::{FetchProgress, FetchStatus, WriteProgress};
use tokio::sync::watch;

// For argp::FromArgs
pub fn record_kind(value: &str) -> Result<RecordKind, String> {
    value.parse().map_err(|_| {
        let names = RecordKind::variants().iter().map(|k| k.as_str()).collect::<Vec<_>>();
        format!("unknown collection '{}', expected one of: {}", value, names.join(", "))
    })
}

pub fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

pub fn credential(config: &Config) -> Credential {
    Credential::new(Arc::new(FileCredentialStore::new(config.credential.path.clone())))
}

/// Print fetch progress as it changes. Runs until the task is aborted.
pub async fn print_fetch_progress(mut rx: watch::Receiver<FetchProgress>) {
    while rx.changed().await.is_ok() {
        let progress = rx.borrow_and_update().clone();
        if progress.status != FetchStatus::Running || progress.current_page == 0 {
            continue;
        }
        if progress.last_record_label.is_empty() {
            eprintln!("Fetching page {}...", progress.current_page);
        } else {
            eprintln!(
                "Page {}: {} records (last: {})",
                progress.current_page, progress.fetched, progress.last_record_label
            );
        }
    }
}

pub async fn print_write_progress(mut rx: watch::Receiver<WriteProgress>) {
    while rx.changed().await.is_ok() {
        let progress = rx.borrow_and_update().clone();
        if progress.running {
            eprintln!(
                "[{:>3}%] {}/{} written, {} failed",
                progress.percent(),
                progress.index,
                progress.total,
                progress.failed
            );
        }
    }
}
