pub mod config;
pub mod credential;
pub mod error;
pub mod models;
pub mod transform;
pub mod util;

pub use credential::Credential;
pub use error::{ImportError, ValidationError};
pub use models::{Collection, NormalizedRecord, RecordKind, RemoteRecord};
pub use transform::normalize;
