use async_trait::async_trait;
use keyring::{Entry, Error as KeyringError};
use log::{debug, error};

use super::backend::CredentialBackend;
use crate::constants::KEYRING_SERVICE;
use crate::error::{AuthError, AuthResult};

/// OS keychain medium. Each entry key maps to one keyring account
/// under the fixed service name.
#[derive(Debug)]
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    fn entry(&self, key: &str) -> AuthResult<Entry> {
        Entry::new(&self.service, key).map_err(|e| {
            error!(
                "Failed to create keyring entry - OS: {}, error: {}",
                std::env::consts::OS,
                e
            );
            AuthError::Storage(format!("Failed to create keyring entry: {}", e))
        })
    }

    /// Probes whether the keychain is usable on this platform by
    /// writing and removing a throwaway entry.
    pub fn probe() -> bool {
        let Ok(entry) = Entry::new(KEYRING_SERVICE, "capability_probe") else {
            return false;
        };
        if entry.set_password("ok").is_err() {
            return false;
        }
        let _ = entry.delete_credential();
        true
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialBackend for KeyringBackend {
    async fn set_item(&self, key: &str, value: &str) -> AuthResult<()> {
        self.entry(key)?.set_password(value).map_err(|e| {
            error!("Failed to store {} in keyring: {}", key, e);
            AuthError::Storage(format!("Failed to store credential: {}", e))
        })
    }

    async fn get_item(&self, key: &str) -> AuthResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(KeyringError::NoEntry) => {
                debug!("No keyring entry for {}", key);
                Ok(None)
            }
            Err(e) => {
                error!("Keyring read failed for {}: {}", key, e);
                Err(AuthError::Storage(format!(
                    "Failed to read credential: {}",
                    e
                )))
            }
        }
    }

    async fn remove_item(&self, key: &str) -> AuthResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
            Err(e) => {
                error!("Keyring delete failed for {}: {}", key, e);
                Err(AuthError::Storage(format!(
                    "Failed to clear credential: {}",
                    e
                )))
            }
        }
    }
}
