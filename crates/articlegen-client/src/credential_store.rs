//! Durable holder of the bearer token.
//!
//! The token is the only value this client persists. It lives under a single
//! fixed key in a small versioned key-value document so that other client
//! settings can share the file without clobbering it.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const TOKEN_KEY: &str = "token";
const STORE_SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "credentials.v1.json";
const STORE_DIR_NAME: &str = "articlegen";

#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    #[error("credential store io failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credential store encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// No expiry is tracked here: a stale token is only discovered when the
/// remote rejects it.
pub trait CredentialStore: Send + Sync {
    fn save(&self, token: &str) -> Result<(), CredentialStoreError>;
    fn load(&self) -> Result<Option<String>, CredentialStoreError>;
    fn clear(&self) -> Result<(), CredentialStoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CredentialDocument {
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

impl Default for CredentialDocument {
    fn default() -> Self {
        Self {
            version: STORE_SCHEMA_VERSION,
            entries: BTreeMap::new(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn at_default_location() -> Self {
        Self::new(default_store_path())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing, unreadable-as-json, or wrong-version document reads as
    /// empty rather than failing.
    fn read_document(&self) -> Result<CredentialDocument, CredentialStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CredentialDocument::default());
            }
            Err(source) => {
                return Err(CredentialStoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        match serde_json::from_str::<CredentialDocument>(&raw) {
            Ok(document) if document.version == STORE_SCHEMA_VERSION => Ok(document),
            Ok(document) => {
                tracing::warn!(
                    path = %self.path.display(),
                    version = document.version,
                    "ignoring credential store with unsupported version"
                );
                Ok(CredentialDocument::default())
            }
            Err(error) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %error,
                    "ignoring corrupt credential store"
                );
                Ok(CredentialDocument::default())
            }
        }
    }

    fn write_document(&self, mut document: CredentialDocument) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| CredentialStoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        document.version = STORE_SCHEMA_VERSION;
        document.updated_at = Some(Utc::now().to_rfc3339());
        let encoded = serde_json::to_string_pretty(&document)?;

        // Written beside the target and renamed over it, so a crash mid-write
        // never leaves a truncated store. Owner-only on unix.
        let tmp_path = temporary_store_path(&self.path);
        write_private(&tmp_path, encoded.as_bytes()).map_err(|source| {
            CredentialStoreError::Io {
                path: tmp_path.clone(),
                source,
            }
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| CredentialStoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, token: &str) -> Result<(), CredentialStoreError> {
        let mut document = self.read_document()?;
        document
            .entries
            .insert(TOKEN_KEY.to_string(), token.to_string());
        self.write_document(document)
    }

    fn load(&self) -> Result<Option<String>, CredentialStoreError> {
        let document = self.read_document()?;
        Ok(document.entries.get(TOKEN_KEY).cloned())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        let mut document = self.read_document()?;
        if document.entries.remove(TOKEN_KEY).is_none() && !self.path.exists() {
            return Ok(());
        }
        self.write_document(document)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, token: &str) -> Result<(), CredentialStoreError> {
        let mut guard = self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(token.to_string());
        Ok(())
    }

    fn load(&self) -> Result<Option<String>, CredentialStoreError> {
        let guard = self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(guard.clone())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        let mut guard = self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
        Ok(())
    }
}

fn default_store_path() -> PathBuf {
    if let Some(mut data_dir) = dirs::data_local_dir() {
        data_dir.push(STORE_DIR_NAME);
        data_dir.push(STORE_FILE_NAME);
        return data_dir;
    }

    if let Some(mut home_dir) = dirs::home_dir() {
        home_dir.push(format!(".{STORE_DIR_NAME}"));
        home_dir.push(STORE_FILE_NAME);
        return home_dir;
    }

    PathBuf::from(STORE_FILE_NAME)
}

fn temporary_store_path(path: &Path) -> PathBuf {
    let mut file_name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_else(|| STORE_FILE_NAME.into());
    file_name.push(".tmp");
    path.with_file_name(file_name)
}

fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;

        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()?;

    // `mode` only applies on creation; a leftover temp file keeps its old bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
