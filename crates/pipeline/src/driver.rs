use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use avoda_sync_api::{CollectionSource, Page};
use avoda_sync_core::{Collection, Credential, ImportError, RemoteRecord, ValidationError};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Live view of a fetch, published after every page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchProgress {
    pub status: FetchStatus,
    /// Page currently being requested (or last requested), starting at 1.
    pub current_page: u32,
    pub fetched: usize,
    pub last_record_label: String,
    pub error: Option<ImportError>,
}

/// Result of one fetch session. Records gathered before a failure or cancellation are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub status: FetchStatus,
    pub records: Vec<RemoteRecord>,
    pub last_page: u32,
    pub error: Option<ImportError>,
}

/// Leaves `Running` if the session future is dropped before it finishes.
struct RunningGuard<'a> {
    progress: &'a watch::Sender<FetchProgress>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.progress.send_if_modified(|progress| {
            if progress.status != FetchStatus::Running {
                return false;
            }
            tracing::warn!("Fetch dropped on page {}", progress.current_page);
            progress.status = FetchStatus::Cancelled;
            true
        });
    }
}

#[derive(Default)]
struct FetchSession {
    current_page: u32,
    accumulated: Vec<RemoteRecord>,
    last_record_label: String,
}

/// Pages through a remote collection one request at a time.
///
/// Cancellation is cooperative: [`PaginationDriver::cancel`] is observed before each page
/// request, never during one.
pub struct PaginationDriver {
    source: Arc<dyn CollectionSource>,
    credential: Credential,
    page_size: u32,
    max_pages: Option<u32>,
    cancelled: AtomicBool,
    progress: watch::Sender<FetchProgress>,
}

impl PaginationDriver {
    pub fn new(
        source: Arc<dyn CollectionSource>,
        credential: Credential,
        page_size: u32,
        max_pages: Option<u32>,
    ) -> Self {
        Self {
            source,
            credential,
            page_size,
            max_pages,
            cancelled: AtomicBool::new(false),
            progress: watch::Sender::new(FetchProgress::default()),
        }
    }

    pub fn progress(&self) -> FetchProgress { self.progress.borrow().clone() }

    pub fn subscribe(&self) -> watch::Receiver<FetchProgress> { self.progress.subscribe() }

    /// Request that the running session stop before its next page.
    pub fn cancel(&self) {
        if self.progress.borrow().status == FetchStatus::Running {
            tracing::info!("Cancelling fetch");
        }
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Fetch every page of `collection` until an empty page, an error, or cancellation.
    ///
    /// Fails only when the session cannot start; errors during the session are reported in
    /// the returned [`FetchOutcome`] along with the records fetched so far.
    pub async fn start(&self, collection: &Collection) -> Result<FetchOutcome, ImportError> {
        self.credential.bearer()?;
        let mut started = false;
        self.progress.send_if_modified(|progress| {
            if progress.status == FetchStatus::Running {
                return false;
            }
            self.cancelled.store(false, Ordering::SeqCst);
            *progress = FetchProgress { status: FetchStatus::Running, ..Default::default() };
            started = true;
            true
        });
        if !started {
            return Err(ValidationError::AlreadyRunning.into());
        }
        let _guard = RunningGuard { progress: &self.progress };
        tracing::info!("Fetching all {} (page size {})", collection.kind(), self.page_size);

        let mut session = FetchSession::default();
        let (status, error) = self.run(collection, &mut session).await;
        match &error {
            Some(e) => tracing::warn!(
                "Fetch {:?} after {} pages ({} records): {}",
                status,
                session.current_page,
                session.accumulated.len(),
                e
            ),
            None => tracing::info!(
                "Fetch {:?} after {} pages ({} records)",
                status,
                session.current_page,
                session.accumulated.len()
            ),
        }
        self.progress.send_modify(|progress| {
            progress.status = status;
            progress.error = error.clone();
        });
        Ok(FetchOutcome {
            status,
            records: session.accumulated,
            last_page: session.current_page,
            error,
        })
    }

    async fn run(
        &self,
        collection: &Collection,
        session: &mut FetchSession,
    ) -> (FetchStatus, Option<ImportError>) {
        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                return (FetchStatus::Cancelled, None);
            }
            let page = session.current_page + 1;
            if let Some(limit) = self.max_pages
                && page > limit
            {
                return (FetchStatus::Failed, Some(ImportError::PageLimitExceeded { limit }));
            }
            session.current_page = page;
            self.progress.send_modify(|progress| progress.current_page = page);

            let Page { records, len } =
                match self.source.fetch_page(collection, page, self.page_size).await {
                    Ok(fetched) if fetched.is_end() => return (FetchStatus::Completed, None),
                    Ok(fetched) => fetched,
                    Err(e) => return (FetchStatus::Failed, Some(e)),
                };
            match records.last() {
                Some(last) => session.last_record_label = last.label(),
                None => tracing::warn!("Page {} held {} null entries and no records", page, len),
            }
            session.accumulated.extend(records);
            tracing::debug!("Page {} done, {} records so far", page, session.accumulated.len());
            self.progress.send_modify(|progress| {
                progress.fetched = session.accumulated.len();
                progress.last_record_label = session.last_record_label.clone();
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use async_trait::async_trait;
    use avoda_sync_core::models::{EmployerRecord, JobFilters, JobRecord};

    use super::*;

    type PageResult = Result<Page, ImportError>;

    /// Serves scripted pages and records what was requested.
    #[derive(Default)]
    struct ScriptedSource {
        pages: Mutex<Vec<PageResult>>,
        requested: Mutex<Vec<u32>>,
        on_page: Mutex<Option<Box<dyn Fn(u32) + Send>>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Result<Vec<RemoteRecord>, ImportError>>) -> Self {
            Self::from_pages(pages.into_iter().map(|page| page.map(Page::from)).collect())
        }

        fn from_pages(pages: Vec<PageResult>) -> Self {
            Self { pages: Mutex::new(pages), ..Default::default() }
        }

        fn requested(&self) -> Vec<u32> { self.requested.lock().unwrap().clone() }
    }

    #[async_trait]
    impl CollectionSource for ScriptedSource {
        async fn fetch_page(
            &self,
            _collection: &Collection,
            page: u32,
            _page_size: u32,
        ) -> Result<Page, ImportError> {
            self.requested.lock().unwrap().push(page);
            if let Some(hook) = self.on_page.lock().unwrap().as_ref() {
                hook(page);
            }
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() { Ok(Page::default()) } else { pages.remove(0) }
        }
    }

    /// Hangs on the first request, then serves an empty page.
    #[derive(Default)]
    struct HangingSource {
        served: AtomicBool,
    }

    #[async_trait]
    impl CollectionSource for HangingSource {
        async fn fetch_page(
            &self,
            _collection: &Collection,
            _page: u32,
            _page_size: u32,
        ) -> Result<Page, ImportError> {
            if !self.served.swap(true, Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            Ok(Page::default())
        }
    }

    fn jobs(page: u32, count: usize) -> Vec<RemoteRecord> {
        (0..count)
            .map(|i| {
                RemoteRecord::Job(JobRecord {
                    id: Some(format!("{page}-{i}")),
                    name: Some(format!("job {page}-{i}")),
                    ..Default::default()
                })
            })
            .collect()
    }

    fn ids(records: &[RemoteRecord]) -> Vec<String> {
        records
            .iter()
            .map(|r| match r {
                RemoteRecord::Job(job) => job.id.clone().unwrap_or_default(),
                RemoteRecord::Employer(employer) => employer.id.clone().unwrap_or_default(),
            })
            .collect()
    }

    fn driver(source: Arc<ScriptedSource>) -> PaginationDriver {
        PaginationDriver::new(source, Credential::in_memory("token"), 100, Some(1000))
    }

    fn collection() -> Collection { Collection::Jobs(JobFilters::default()) }

    #[tokio::test]
    async fn test_three_pages_then_empty() {
        let source =
            Arc::new(ScriptedSource::new(vec![Ok(jobs(1, 100)), Ok(jobs(2, 100)), Ok(jobs(3, 37))]));
        let driver = driver(source.clone());
        let outcome = driver.start(&collection()).await.unwrap();

        assert_eq!(outcome.status, FetchStatus::Completed);
        assert_eq!(outcome.records.len(), 237);
        assert_eq!(outcome.error, None);
        assert_eq!(source.requested(), [1, 2, 3, 4]);
        let progress = driver.progress();
        assert_eq!(progress.status, FetchStatus::Completed);
        assert_eq!(progress.current_page, 4);
        assert_eq!(progress.fetched, 237);
        assert_eq!(progress.last_record_label, "job 3-36");
    }

    #[tokio::test]
    async fn test_order_preserved() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(jobs(1, 3)), Ok(jobs(2, 2))]));
        let outcome = driver(source).start(&collection()).await.unwrap();
        assert_eq!(ids(&outcome.records), ["1-0", "1-1", "1-2", "2-0", "2-1"]);
    }

    #[tokio::test]
    async fn test_error_envelope_on_page_two_keeps_first_page() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(jobs(1, 100)),
            Err(ImportError::remote("rate limited")),
            Ok(jobs(3, 100)),
        ]));
        let driver = driver(source.clone());
        let outcome = driver.start(&collection()).await.unwrap();

        assert_eq!(outcome.status, FetchStatus::Failed);
        assert_eq!(outcome.records.len(), 100);
        assert_eq!(outcome.error, Some(ImportError::remote("rate limited")));
        assert_eq!(outcome.error.unwrap().to_string(), "Remote error: rate limited");
        assert_eq!(source.requested(), [1, 2]);
        assert_eq!(driver.progress().status, FetchStatus::Failed);
    }

    #[tokio::test]
    async fn test_transport_error_on_first_page() {
        let source =
            Arc::new(ScriptedSource::new(vec![Err(ImportError::transport(Some(503), "down"))]));
        let outcome = driver(source).start(&collection()).await.unwrap();
        assert_eq!(outcome.status, FetchStatus::Failed);
        assert!(outcome.records.is_empty());
        assert!(matches!(outcome.error, Some(ImportError::Transport { status: Some(503), .. })));
    }

    #[tokio::test]
    async fn test_cancel_between_pages_returns_prefix() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(jobs(1, 100)),
            Ok(jobs(2, 100)),
            Ok(jobs(3, 100)),
            Ok(jobs(4, 100)),
        ]));
        let driver = Arc::new(driver(source.clone()));
        {
            let driver = Arc::downgrade(&driver);
            *source.on_page.lock().unwrap() = Some(Box::new(move |page| {
                // Stop requested while page 2 is in flight.
                if page == 2
                    && let Some(driver) = driver.upgrade()
                {
                    driver.cancel();
                }
            }));
        }
        let outcome = driver.start(&collection()).await.unwrap();

        assert_eq!(outcome.status, FetchStatus::Cancelled);
        assert_eq!(outcome.records.len(), 200);
        assert_eq!(ids(&outcome.records)[..100], ids(&jobs(1, 100))[..]);
        assert_eq!(ids(&outcome.records)[100..], ids(&jobs(2, 100))[..]);
        assert_eq!(source.requested(), [1, 2]);
        assert_eq!(driver.progress().status, FetchStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_before_start_is_cleared() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(jobs(1, 5))]));
        let driver = driver(source);
        driver.cancel();
        let outcome = driver.start(&collection()).await.unwrap();
        assert_eq!(outcome.status, FetchStatus::Completed);
        assert_eq!(outcome.records.len(), 5);
    }

    #[tokio::test]
    async fn test_rejects_missing_credential() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(jobs(1, 5))]));
        let driver = PaginationDriver::new(source.clone(), Credential::in_memory(""), 100, None);
        let result = driver.start(&collection()).await;
        assert_eq!(result, Err(ValidationError::MissingCredential.into()));
        assert!(source.requested().is_empty());
        assert_eq!(driver.progress().status, FetchStatus::Idle);
    }

    #[tokio::test]
    async fn test_rejects_second_start_while_running() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(jobs(1, 1))]));
        let driver = Arc::new(driver(source.clone()));
        let nested = Arc::new(Mutex::new(None));
        {
            let driver = Arc::downgrade(&driver);
            let nested = nested.clone();
            *source.on_page.lock().unwrap() = Some(Box::new(move |page| {
                if page == 1
                    && let Some(driver) = driver.upgrade()
                {
                    let fut = driver.start(&Collection::Employers);
                    let result = futures_now(fut);
                    *nested.lock().unwrap() = Some(result);
                }
            }));
        }
        let outcome = driver.start(&collection()).await.unwrap();
        assert_eq!(outcome.status, FetchStatus::Completed);
        assert_eq!(
            nested.lock().unwrap().clone(),
            Some(Err(ImportError::Validation(ValidationError::AlreadyRunning)))
        );
        assert_eq!(source.requested(), [1, 2]);
    }

    /// Polls a future that is expected to resolve without suspending.
    fn futures_now<F: std::future::Future>(fut: F) -> F::Output {
        let mut fut = std::pin::pin!(fut);
        let mut cx = std::task::Context::from_waker(std::task::Waker::noop());
        match fut.as_mut().poll(&mut cx) {
            std::task::Poll::Ready(output) => output,
            std::task::Poll::Pending => panic!("future suspended"),
        }
    }

    #[tokio::test]
    async fn test_restart_after_completion() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(jobs(1, 2)),
            Ok(Vec::new()),
            Ok(vec![RemoteRecord::Employer(EmployerRecord {
                first_name: Some("Dana".into()),
                ..Default::default()
            })]),
        ]));
        let driver = driver(source);
        let first = driver.start(&collection()).await.unwrap();
        assert_eq!(first.records.len(), 2);
        let second = driver.start(&Collection::Employers).await.unwrap();
        assert_eq!(second.status, FetchStatus::Completed);
        assert_eq!(second.records.len(), 1);
        assert_eq!(driver.progress().last_record_label, "Dana");
        assert_eq!(driver.progress().current_page, 2);
    }

    #[tokio::test]
    async fn test_dropped_session_can_restart() {
        let driver = PaginationDriver::new(
            Arc::new(HangingSource::default()),
            Credential::in_memory("token"),
            100,
            None,
        );
        let result =
            tokio::time::timeout(Duration::from_millis(50), driver.start(&collection())).await;
        assert!(result.is_err());
        assert_eq!(driver.progress().status, FetchStatus::Cancelled);
        assert_eq!(driver.progress().current_page, 1);

        let outcome = driver.start(&collection()).await.unwrap();
        assert_eq!(outcome.status, FetchStatus::Completed);
        assert_eq!(driver.progress().status, FetchStatus::Completed);
    }

    #[tokio::test]
    async fn test_page_of_nulls_keeps_paging() {
        let source = Arc::new(ScriptedSource::from_pages(vec![
            Ok(Page::from(jobs(1, 2))),
            Ok(Page { records: Vec::new(), len: 2 }),
            Ok(Page::from(jobs(3, 1))),
        ]));
        let driver = PaginationDriver::new(source.clone(), Credential::in_memory("t"), 2, None);
        let outcome = driver.start(&collection()).await.unwrap();
        assert_eq!(outcome.status, FetchStatus::Completed);
        assert_eq!(ids(&outcome.records), ["1-0", "1-1", "3-0"]);
        assert_eq!(source.requested(), [1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_page_limit() {
        let source =
            Arc::new(ScriptedSource::new(vec![Ok(jobs(1, 1)), Ok(jobs(2, 1)), Ok(jobs(3, 1))]));
        let driver = PaginationDriver::new(source.clone(), Credential::in_memory("t"), 1, Some(2));
        let outcome = driver.start(&collection()).await.unwrap();
        assert_eq!(outcome.status, FetchStatus::Failed);
        assert_eq!(outcome.error, Some(ImportError::PageLimitExceeded { limit: 2 }));
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(source.requested(), [1, 2]);
    }

    #[tokio::test]
    async fn test_progress_published_per_page() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(jobs(1, 10)), Ok(jobs(2, 5))]));
        let driver = Arc::new(driver(source.clone()));
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        {
            let driver = Arc::downgrade(&driver);
            let snapshots = snapshots.clone();
            *source.on_page.lock().unwrap() = Some(Box::new(move |_| {
                if let Some(driver) = driver.upgrade() {
                    let progress = driver.progress();
                    snapshots.lock().unwrap().push((progress.current_page, progress.fetched));
                }
            }));
        }
        driver.start(&collection()).await.unwrap();
        assert_eq!(*snapshots.lock().unwrap(), [(1, 0), (2, 10), (3, 15)]);
    }
}
