use std::{
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, RwLock},
};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::error::{ImportError, ValidationError};

/// Key the token is stored under, shared with the embedded widget's local storage.
pub const TOKEN_KEY: &str = "avoda_token";

/// Persistence for the API bearer token.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn store(&self, token: &str) -> Result<()>;
}

/// Handle to the bearer token, read from its store on every call.
///
/// Cloning shares the underlying store, so a token saved through one handle is seen by all.
#[derive(Clone)]
pub struct Credential {
    store: Arc<dyn CredentialStore>,
}

impl Credential {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self { Self { store } }

    pub fn in_memory(token: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryCredentialStore::new(Some(token.into()))))
    }

    /// Current token, or a validation error when none is set.
    pub fn bearer(&self) -> Result<String, ImportError> {
        let token = self
            .store
            .load()
            .map_err(|e| ValidationError::CredentialUnavailable(format!("{e:#}")))?;
        match token {
            Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(ValidationError::MissingCredential.into()),
        }
    }

    pub fn save(&self, token: &str) -> Result<(), ImportError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ValidationError::EmptyToken.into());
        }
        self.store
            .store(token)
            .map_err(|e| ValidationError::CredentialUnavailable(format!("{e:#}")))?;
        tracing::info!("Saved API token");
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new(token: Option<String>) -> Self { Self { token: RwLock::new(token) } }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.token.read().map_err(|_| anyhow::anyhow!("Token lock poisoned"))?.clone())
    }

    fn store(&self, token: &str) -> Result<()> {
        *self.token.write().map_err(|_| anyhow::anyhow!("Token lock poisoned"))? =
            Some(token.to_string());
        Ok(())
    }
}

/// Stores the token in a JSON object file, leaving any other keys untouched.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    fn read_map(&self) -> Result<Map<String, Value>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", self.path.display()))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.read_map()?.get(TOKEN_KEY).and_then(Value::as_str).map(str::to_string))
    }

    fn store(&self, token: &str) -> Result<()> {
        let mut map = self.read_map()?;
        map.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        let data = serde_json::to_string_pretty(&map)?;
        fs::write(&self.path, data)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token() {
        let credential = Credential::new(Arc::new(MemoryCredentialStore::default()));
        assert_eq!(credential.bearer(), Err(ValidationError::MissingCredential.into()));
        let credential = Credential::in_memory("   ");
        assert_eq!(credential.bearer(), Err(ValidationError::MissingCredential.into()));
    }

    #[test]
    fn test_save_trims_and_rejects_empty() {
        let credential = Credential::new(Arc::new(MemoryCredentialStore::default()));
        assert_eq!(credential.save("  \n"), Err(ValidationError::EmptyToken.into()));
        credential.save("  abc123 ").unwrap();
        assert_eq!(credential.bearer().unwrap(), "abc123");
    }

    #[test]
    fn test_shared_between_clones() {
        let credential = Credential::in_memory("first");
        let other = credential.clone();
        credential.save("second").unwrap();
        assert_eq!(other.bearer().unwrap(), "second");
    }

    #[test]
    fn test_file_store_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let credential = Credential::new(Arc::new(FileCredentialStore::new(&path)));
        credential.save("tok-1").unwrap();

        let reloaded = Credential::new(Arc::new(FileCredentialStore::new(&path)));
        assert_eq!(reloaded.bearer().unwrap(), "tok-1");
        let map: Map<String, Value> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(map.get("theme"), Some(&Value::String("dark".into())));
    }

    #[test]
    fn test_file_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "not json").unwrap();
        let credential = Credential::new(Arc::new(FileCredentialStore::new(&path)));
        assert!(matches!(
            credential.bearer(),
            Err(ImportError::Validation(ValidationError::CredentialUnavailable(_)))
        ));
    }
}
