mod driver;
mod writer;

use std::sync::Arc;

use anyhow::Result;
use avoda_sync_api::{CollectionSource, RemoteClient};
use avoda_sync_board::{BoardApi, ColumnOptions, ItemId, MondayClient};
use avoda_sync_core::{Collection, Credential, ImportError, NormalizedRecord, config::Config};
pub use driver::{FetchOutcome, FetchProgress, FetchStatus, PaginationDriver};
pub use writer::{
    BoardItemWriter, CreatedItem, FailedItem, WriteProgress, WriteReport, WriteSession,
};

/// The fetch → normalize → write pipeline for one remote API and one board.
#[derive(Clone)]
pub struct Importer {
    driver: Arc<PaginationDriver>,
    writer: Arc<BoardItemWriter>,
    board: Arc<dyn BoardApi>,
}

impl Importer {
    pub fn new(config: &Config, credential: Credential) -> Result<Self> {
        let source = Arc::new(RemoteClient::new(&config.remote, credential.clone())?);
        let board = Arc::new(MondayClient::new(&config.board)?);
        let options = ColumnOptions {
            country_code: config.board.country_code.clone(),
            default_job_name: config.board.default_job_name.clone(),
        };
        Ok(Self::with_clients(
            source,
            board,
            credential,
            options,
            config.remote.page_size,
            config.remote.max_pages,
        ))
    }

    pub fn with_clients(
        source: Arc<dyn CollectionSource>,
        board: Arc<dyn BoardApi>,
        credential: Credential,
        options: ColumnOptions,
        page_size: u32,
        max_pages: Option<u32>,
    ) -> Self {
        let driver =
            Arc::new(PaginationDriver::new(source, credential.clone(), page_size, max_pages));
        let writer = Arc::new(BoardItemWriter::new(board.clone(), credential, options));
        Self { driver, writer, board }
    }

    pub fn driver(&self) -> &Arc<PaginationDriver> { &self.driver }

    pub fn writer(&self) -> &Arc<BoardItemWriter> { &self.writer }

    pub async fn fetch(&self, collection: &Collection) -> Result<FetchOutcome, ImportError> {
        self.driver.start(collection).await
    }

    pub fn normalize(outcome: &FetchOutcome) -> Vec<NormalizedRecord> {
        outcome.records.iter().map(avoda_sync_core::normalize).collect()
    }

    /// Write records to the board the importer is attached to.
    pub async fn write(&self, records: Vec<NormalizedRecord>) -> Result<WriteSession, ImportError> {
        let target = self.board.context().await?;
        self.writer.write_all(records, target).await
    }

    pub async fn retry(
        &self,
        session: &mut WriteSession,
        position: usize,
    ) -> Result<ItemId, ImportError> {
        self.writer.retry(session, position).await
    }
}
