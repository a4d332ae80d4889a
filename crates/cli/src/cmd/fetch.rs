use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use argp::FromArgs;
use avoda_sync_core::{Collection, RecordKind};
use avoda_sync_pipeline::{FetchOutcome, FetchStatus, Importer};

use crate::util::{credential, load_config, print_fetch_progress, record_kind};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Fetch every page of a collection and print the normalized records as JSON.
#[argp(subcommand, name = "fetch")]
pub struct Args {
    #[argp(positional, from_str_fn(record_kind))]
    /// collection to fetch (jobs or employers)
    collection: RecordKind,
    #[argp(option, short = 'o')]
    /// write records to output file
    output: Option<PathBuf>,
}

pub async fn run(config_path: &Path, args: Args) -> Result<()> {
    let config = load_config(config_path)?;
    let importer = Importer::new(&config, credential(&config))?;
    let outcome = fetch(&importer, &Collection::from(args.collection)).await?;

    let records = Importer::normalize(&outcome);
    let json = serde_json::to_string_pretty(&records).context("Failed to encode records")?;
    if let Some(out_path) = &args.output {
        std::fs::write(out_path, json)
            .with_context(|| format!("Failed to write output file '{}'", out_path.display()))?;
        eprintln!("Wrote {} records to {}", records.len(), out_path.display());
    } else {
        println!("{}", json);
    }
    Ok(())
}

/// Run the driver with live progress, cancelling on Ctrl-C.
///
/// Cancelled and failed sessions still return their records; only a session that could not
/// start is an error.
pub async fn fetch(importer: &Importer, collection: &Collection) -> Result<FetchOutcome> {
    let printer = tokio::spawn(print_fetch_progress(importer.driver().subscribe()));
    let driver = importer.driver().clone();
    let cancel = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling after the current page...");
            driver.cancel();
        }
    });
    let result = importer.fetch(collection).await;
    cancel.abort();
    printer.abort();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => bail!("Failed to start fetch: {e}"),
    };
    match (&outcome.status, &outcome.error) {
        (FetchStatus::Failed, Some(e)) => eprintln!(
            "Fetch failed on page {} after {} records: {}",
            outcome.last_page,
            outcome.records.len(),
            e
        ),
        (status, _) => eprintln!(
            "Fetch {:?}: {} records from {} pages",
            status,
            outcome.records.len(),
            outcome.last_page
        ),
    }
    Ok(outcome)
}
