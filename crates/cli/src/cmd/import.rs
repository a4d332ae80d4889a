use std::path::Path;

use anyhow::{Result, bail};
use argp::FromArgs;
use avoda_sync_core::{Collection, ImportError, RecordKind};
use avoda_sync_pipeline::{FetchStatus, Importer};

use crate::{
    cmd::fetch::fetch,
    util::{credential, load_config, print_write_progress, record_kind},
};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Fetch a collection and create one board item per record.
#[argp(subcommand, name = "import")]
pub struct Args {
    #[argp(positional, from_str_fn(record_kind))]
    /// collection to import (jobs or employers)
    collection: RecordKind,
    #[argp(switch)]
    /// write the records fetched before a failure or cancellation
    partial: bool,
}

pub async fn run(config_path: &Path, args: Args) -> Result<()> {
    let config = load_config(config_path)?;
    let importer = Importer::new(&config, credential(&config))?;
    let outcome = fetch(&importer, &Collection::from(args.collection)).await?;
    if outcome.status != FetchStatus::Completed && !args.partial {
        bail!("Fetch did not complete; rerun with --partial to write the fetched records");
    }

    let records = Importer::normalize(&outcome);
    let printer = tokio::spawn(print_write_progress(importer.writer().subscribe()));
    let writer = importer.writer().clone();
    let cancel = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling after the current item...");
            writer.cancel();
        }
    });
    let result = importer.write(records).await;
    cancel.abort();
    printer.abort();
    let mut session = result?;
    println!("{}", session.report().to_string().trim_end());
    for item in session.created() {
        tracing::debug!("Record {} -> item {}", item.position + 1, item.item_id);
    }

    // One pass over the failures, the way a user would press "retry" on each.
    let positions = session
        .failed()
        .iter()
        .filter(|item| item.reason != ImportError::Cancelled)
        .map(|item| item.position)
        .collect::<Vec<_>>();
    for position in positions {
        if let Err(e) = importer.retry(&mut session, position).await {
            tracing::warn!("Retry of record {} failed: {}", position + 1, e);
        }
    }
    if !session.failed().is_empty() {
        bail!("{}", session.report());
    }
    Ok(())
}
