//! Session record in a JSON file
//!
//! Writes go to a temporary file in the target directory which is then
//! renamed over the record, so readers never observe a partial write.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use belay_core::TokenStore;
use belay_domain::{BelayError, Result, TokenPair, UserProfile};
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::SessionRecord;
use crate::errors::InfraError;

/// [`TokenStore`] backed by a single JSON file.
#[derive(Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    // Read-modify-write cycles on the record must not interleave.
    lock: Arc<Mutex<()>>,
}

impl FileTokenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), lock: Arc::new(Mutex::new(())) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_record(&self) -> Option<SessionRecord> {
        let path = self.path.clone();
        let lock = Arc::clone(&self.lock);
        let result = tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            read_record(&path)
        })
        .await;

        match result {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "session file read task failed");
                None
            }
        }
    }

    async fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut SessionRecord) + Send + 'static,
    {
        let path = self.path.clone();
        let lock = Arc::clone(&self.lock);
        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            let mut record = read_record(&path).unwrap_or_default();
            change(&mut record);
            if record.is_empty() {
                remove_record(&path)
            } else {
                write_record(&path, &record)
            }
        })
        .await
        .map_err(|e| BelayError::Internal(format!("session file task failed: {e}")))?
    }
}

fn read_record(path: &Path) -> Option<SessionRecord> {
    match std::fs::read_to_string(path) {
        Ok(raw) => SessionRecord::decode(&raw, "file"),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read session file");
            None
        }
    }
}

fn write_record(path: &Path, record: &SessionRecord) -> Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&directory).map_err(InfraError::from)?;

    let payload = serde_json::to_vec_pretty(record).map_err(InfraError::from)?;
    let mut staged = NamedTempFile::new_in(&directory).map_err(InfraError::from)?;
    staged.write_all(&payload).map_err(InfraError::from)?;
    staged.as_file().sync_all().map_err(InfraError::from)?;
    staged.persist(path).map_err(InfraError::from)?;

    debug!(path = %path.display(), "session file written");
    Ok(())
}

fn remove_record(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "session file removed");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(InfraError::from(err).into()),
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Option<TokenPair> {
        self.read_record().await.and_then(|record| record.tokens)
    }

    async fn save(&self, pair: &TokenPair) -> Result<()> {
        let pair = pair.clone();
        self.update(move |record| record.tokens = Some(pair)).await
    }

    async fn clear(&self) -> Result<()> {
        self.update(|record| *record = SessionRecord::default()).await
    }

    async fn load_profile(&self) -> Option<UserProfile> {
        self.read_record().await.and_then(|record| record.user)
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let profile = profile.clone();
        self.update(move |record| record.user = Some(profile)).await
    }
}
