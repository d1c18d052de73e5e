use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::backend::CredentialBackend;
use crate::error::{AuthError, AuthResult};

/// Plain persisted medium used when the OS keychain is unavailable.
/// Stores entries as a single JSON map under the platform data dir.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    // Serializes read-modify-write cycles on the backing file.
    lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Default location: `<data dir>/fieldforce/credentials.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("fieldforce").join("credentials.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> AuthResult<HashMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AuthError::Storage(format!("Credential file is corrupt: {}", e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(AuthError::Storage(format!(
                "Failed to read credential file: {}",
                e
            ))),
        }
    }

    async fn write_map(&self, map: &HashMap<String, String>) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AuthError::Storage(format!("Failed to create credential dir: {}", e))
            })?;
        }
        let bytes = serde_json::to_vec(map)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to write credential file: {}", e)))
    }
}

#[async_trait]
impl CredentialBackend for FileBackend {
    async fn set_item(&self, key: &str, value: &str) -> AuthResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await
    }

    async fn get_item(&self, key: &str) -> AuthResult<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.get(key).cloned())
    }

    async fn remove_item(&self, key: &str) -> AuthResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(key).is_some() {
            self.write_map(&map).await?;
        } else {
            debug!("No stored entry for {}, nothing to remove", key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let backend = FileBackend::new(path.clone());
        backend.set_item("access_token", "a.b.c").await.unwrap();
        backend.set_item("refresh_token", "d.e.f").await.unwrap();

        // A fresh handle over the same file sees the same entries.
        let reopened = FileBackend::new(path);
        assert_eq!(
            reopened.get_item("access_token").await.unwrap(),
            Some("a.b.c".to_string())
        );
        assert_eq!(
            reopened.get_item("refresh_token").await.unwrap(),
            Some("d.e.f".to_string())
        );
    }

    #[tokio::test]
    async fn remove_is_tolerant_of_missing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("credentials.json"));

        backend.remove_item("never_set").await.unwrap();
        backend.set_item("k", "v").await.unwrap();
        backend.remove_item("k").await.unwrap();
        assert_eq!(backend.get_item("k").await.unwrap(), None);
    }
}
