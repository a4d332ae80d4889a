use thiserror::Error;

/// Errors surfaced by the fetch and write pipelines.
///
/// Values are cloneable so they can be kept in progress snapshots and in the
/// failed list of a write session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// Network failure or a non-success HTTP status.
    #[error("Request failed: {message}")]
    Transport { status: Option<u16>, message: String },
    /// The response carried a GraphQL error envelope instead of data.
    #[error("Remote error: {}", messages.join("; "))]
    Remote { messages: Vec<String> },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A single board item could not be created.
    #[error("Failed to create item: {message}")]
    ItemWrite { message: String },
    #[error("Stopped after {limit} pages without reaching the end of the collection")]
    PageLimitExceeded { limit: u32 },
    /// The write pass was cancelled before this item was attempted.
    #[error("Cancelled before the item was written")]
    Cancelled,
}

impl ImportError {
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport { status, message: message.into() }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote { messages: vec![message.into()] }
    }

    pub fn item_write(message: impl Into<String>) -> Self {
        Self::ItemWrite { message: message.into() }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing API token")]
    MissingCredential,
    #[error("Token cannot be empty")]
    EmptyToken,
    #[error("Token store unavailable: {0}")]
    CredentialUnavailable(String),
    #[error("No board selected")]
    MissingBoardContext,
    #[error("A session is already running")]
    AlreadyRunning,
    #[error("Invalid page request (page {page}, size {page_size})")]
    InvalidPage { page: u32, page_size: u32 },
    #[error("Record {0} is not in the failed list")]
    NotFailed(usize),
}
