use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::backend::CredentialBackend;
use crate::error::{AuthError, AuthResult};

/// In-memory medium. Credentials do not survive a restart; used by
/// tests and as a last resort when no durable medium is available.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialBackend for MemoryBackend {
    async fn set_item(&self, key: &str, value: &str) -> AuthResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| AuthError::Storage(format!("Credential lock poisoned: {}", e)))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_item(&self, key: &str) -> AuthResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| AuthError::Storage(format!("Credential lock poisoned: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    async fn remove_item(&self, key: &str) -> AuthResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| AuthError::Storage(format!("Credential lock poisoned: {}", e)))?;
        entries.remove(key);
        Ok(())
    }
}
