use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use avoda_sync_board::{BoardApi, BoardContext, ColumnOptions, ItemId, ItemPayload};
use avoda_sync_core::{Credential, ImportError, NormalizedRecord, ValidationError};
use tokio::sync::watch;

/// Live view of a write, published after every item.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct WriteProgress {
    pub running: bool,
    /// Number of records attempted so far in the current pass.
    pub index: usize,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

impl WriteProgress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.index * 100 / self.total) as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedItem {
    /// Index of the record in the sequence passed to [`BoardItemWriter::write_all`].
    pub position: usize,
    pub record: NormalizedRecord,
    pub reason: ImportError,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CreatedItem {
    pub position: usize,
    pub item_id: ItemId,
}

/// Bookkeeping for one write pass and any retries that follow it.
///
/// `completed + failed.len()` never exceeds `total`, and equals it once the pass is over.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSession {
    target: BoardContext,
    total: usize,
    completed: usize,
    created: Vec<CreatedItem>,
    failed: Vec<FailedItem>,
}

impl WriteSession {
    fn new(target: BoardContext, total: usize) -> Self {
        Self { target, total, completed: 0, created: Vec::new(), failed: Vec::new() }
    }

    pub fn target(&self) -> BoardContext { self.target }

    pub fn total(&self) -> usize { self.total }

    pub fn completed(&self) -> usize { self.completed }

    pub fn created(&self) -> &[CreatedItem] { &self.created }

    pub fn failed(&self) -> &[FailedItem] { &self.failed }

    pub fn is_complete(&self) -> bool { self.completed == self.total }

    pub fn report(&self) -> WriteReport<'_> {
        if self.is_complete() {
            WriteReport::Complete { total: self.total }
        } else {
            let failed = &self.failed;
            WriteReport::Partial { completed: self.completed, total: self.total, failed }
        }
    }

    fn progress(&self, running: bool, index: usize) -> WriteProgress {
        WriteProgress {
            running,
            index,
            total: self.total,
            completed: self.completed,
            failed: self.failed.len(),
        }
    }
}

/// Final summary of a write session.
#[derive(Debug, PartialEq)]
pub enum WriteReport<'a> {
    Complete { total: usize },
    Partial { completed: usize, total: usize, failed: &'a [FailedItem] },
}

impl fmt::Display for WriteReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete { total } => write!(f, "All {total} items created"),
            Self::Partial { completed, total, failed } => {
                writeln!(f, "Created {completed} of {total} items, {} failed:", failed.len())?;
                for item in *failed {
                    writeln!(f, "  #{}: {}", item.position + 1, item.reason)?;
                }
                Ok(())
            }
        }
    }
}

/// Clears `running` if a write future is dropped before it finishes.
struct RunningGuard<'a> {
    progress: &'a watch::Sender<WriteProgress>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.progress.send_if_modified(|progress| {
            if !progress.running {
                return false;
            }
            tracing::warn!("Write dropped after {} of {} items", progress.index, progress.total);
            progress.running = false;
            true
        });
    }
}

/// Creates one board item per record, strictly in order and one at a time.
///
/// A failed record never stops the pass; it is kept in the session for [`Self::retry`].
/// Cancellation is checked before each item. Records not attempted are kept as failed with
/// [`ImportError::Cancelled`], so they can be retried like any other failure.
pub struct BoardItemWriter {
    board: Arc<dyn BoardApi>,
    credential: Credential,
    options: ColumnOptions,
    cancelled: AtomicBool,
    progress: watch::Sender<WriteProgress>,
}

impl BoardItemWriter {
    pub fn new(board: Arc<dyn BoardApi>, credential: Credential, options: ColumnOptions) -> Self {
        Self {
            board,
            credential,
            options,
            cancelled: AtomicBool::new(false),
            progress: watch::Sender::new(WriteProgress::default()),
        }
    }

    pub fn progress(&self) -> WriteProgress { self.progress.borrow().clone() }

    pub fn subscribe(&self) -> watch::Receiver<WriteProgress> { self.progress.subscribe() }

    /// Request that the running pass stop before its next item.
    pub fn cancel(&self) {
        if self.progress.borrow().running {
            tracing::info!("Cancelling write");
        }
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn begin(&self) -> Result<RunningGuard<'_>, ImportError> {
        self.credential.bearer()?;
        let mut started = false;
        self.progress.send_if_modified(|progress| {
            if progress.running {
                return false;
            }
            self.cancelled.store(false, Ordering::SeqCst);
            progress.running = true;
            started = true;
            true
        });
        if !started {
            return Err(ValidationError::AlreadyRunning.into());
        }
        Ok(RunningGuard { progress: &self.progress })
    }

    pub async fn write_all(
        &self,
        records: Vec<NormalizedRecord>,
        target: BoardContext,
    ) -> Result<WriteSession, ImportError> {
        let _guard = self.begin()?;
        let mut session = WriteSession::new(target, records.len());
        self.progress.send_replace(session.progress(true, 0));
        tracing::info!("Creating {} items on board {}", session.total, target.board_id);

        for (position, record) in records.into_iter().enumerate() {
            if self.cancelled.load(Ordering::SeqCst) {
                session.failed.push(FailedItem { position, record, reason: ImportError::Cancelled });
                self.progress.send_replace(session.progress(true, position + 1));
                continue;
            }
            let payload = ItemPayload::from_record(&record, &self.options);
            match self.board.create_item(target.board_id, &payload.name, &payload.columns).await {
                Ok(item_id) => {
                    tracing::debug!("Created item {} ({})", item_id, payload.name);
                    session.completed += 1;
                    session.created.push(CreatedItem { position, item_id });
                }
                Err(reason) => {
                    tracing::warn!(
                        "Failed to create item {} ({}): {}",
                        position + 1,
                        payload.name,
                        reason
                    );
                    session.failed.push(FailedItem { position, record, reason });
                }
            }
            self.progress.send_replace(session.progress(true, position + 1));
        }

        let skipped = session.failed.iter().filter(|item| item.reason == ImportError::Cancelled);
        match skipped.count() {
            0 => {}
            skipped => tracing::info!("Write cancelled, {} items not attempted", skipped),
        }
        tracing::info!(
            "Created {} of {} items on board {}",
            session.completed,
            session.total,
            target.board_id
        );
        self.progress.send_replace(session.progress(false, session.total));
        Ok(session)
    }

    /// Create the item for one previously failed record.
    ///
    /// On success the record leaves the failed list. On failure it stays there with the new
    /// reason, which is also returned.
    pub async fn retry(
        &self,
        session: &mut WriteSession,
        position: usize,
    ) -> Result<ItemId, ImportError> {
        let index = session
            .failed
            .iter()
            .position(|item| item.position == position)
            .ok_or(ValidationError::NotFailed(position))?;
        let _guard = self.begin()?;
        let payload = ItemPayload::from_record(&session.failed[index].record, &self.options);
        let result =
            self.board.create_item(session.target.board_id, &payload.name, &payload.columns).await;
        match &result {
            Ok(item_id) => {
                tracing::info!("Retry created item {} ({})", item_id, payload.name);
                session.failed.remove(index);
                session.completed += 1;
                session.created.push(CreatedItem { position, item_id: item_id.clone() });
            }
            Err(reason) => {
                tracing::warn!(
                    "Retry failed for item {} ({}): {}",
                    position + 1,
                    payload.name,
                    reason
                );
                session.failed[index].reason = reason.clone();
            }
        }
        self.progress.send_replace(session.progress(false, session.total));
        result
    }
}
