//! Durable credential storage for the client side. One store owns the
//! durable copy of the access token, refresh token and cached profile;
//! the session controller holds only transient references.

pub mod backend;
pub mod file_backend;
pub mod keyring_backend;
pub mod memory_backend;

use log::{info, warn};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_PROFILE_KEY};
use crate::error::AuthResult;
use crate::models::session::UserProfile;
pub use backend::CredentialBackend;
use file_backend::FileBackend;
use keyring_backend::KeyringBackend;
use memory_backend::MemoryBackend;

/// Credential store with a gated asynchronous initialization: the
/// backing medium is selected exactly once, and every read or write
/// issued before that completes queues behind it instead of being
/// dropped.
#[derive(Debug)]
pub struct CredentialStore {
    backend: OnceCell<Arc<dyn CredentialBackend>>,
}

impl CredentialStore {
    /// Store with platform-appropriate medium selection: OS keychain
    /// when usable, otherwise the plain file fallback, otherwise
    /// memory only.
    pub fn new() -> Self {
        Self {
            backend: OnceCell::new(),
        }
    }

    /// Store over an explicit medium. Used by tests and multi-account
    /// setups.
    pub fn with_backend(backend: Arc<dyn CredentialBackend>) -> Self {
        Self {
            backend: OnceCell::new_with(Some(backend)),
        }
    }

    async fn backend(&self) -> &Arc<dyn CredentialBackend> {
        self.backend
            .get_or_init(|| async {
                if KeyringBackend::probe() {
                    info!("Credential store backed by OS keychain");
                    return Arc::new(KeyringBackend::new()) as Arc<dyn CredentialBackend>;
                }
                match FileBackend::default_path() {
                    Some(path) => {
                        warn!(
                            "OS keychain unavailable, falling back to plain file storage at {}",
                            path.display()
                        );
                        Arc::new(FileBackend::new(path)) as Arc<dyn CredentialBackend>
                    }
                    None => {
                        warn!(
                            "No data directory available, credentials will not survive a restart"
                        );
                        Arc::new(MemoryBackend::new()) as Arc<dyn CredentialBackend>
                    }
                }
            })
            .await
    }

    pub async fn set_access_token(&self, token: &str) -> AuthResult<()> {
        self.backend().await.set_item(ACCESS_TOKEN_KEY, token).await
    }

    pub async fn access_token(&self) -> AuthResult<Option<String>> {
        self.backend().await.get_item(ACCESS_TOKEN_KEY).await
    }

    pub async fn clear_access_token(&self) -> AuthResult<()> {
        self.backend().await.remove_item(ACCESS_TOKEN_KEY).await
    }

    pub async fn set_refresh_token(&self, token: &str) -> AuthResult<()> {
        self.backend().await.set_item(REFRESH_TOKEN_KEY, token).await
    }

    pub async fn refresh_token(&self) -> AuthResult<Option<String>> {
        self.backend().await.get_item(REFRESH_TOKEN_KEY).await
    }

    pub async fn clear_refresh_token(&self) -> AuthResult<()> {
        self.backend().await.remove_item(REFRESH_TOKEN_KEY).await
    }

    pub async fn set_user_profile(&self, profile: &UserProfile) -> AuthResult<()> {
        let json = serde_json::to_string(profile)?;
        self.backend().await.set_item(USER_PROFILE_KEY, &json).await
    }

    pub async fn user_profile(&self) -> AuthResult<Option<UserProfile>> {
        match self.backend().await.get_item(USER_PROFILE_KEY).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn clear_user_profile(&self) -> AuthResult<()> {
        self.backend().await.remove_item(USER_PROFILE_KEY).await
    }

    pub async fn clear_all(&self) -> AuthResult<()> {
        let backend = self.backend().await;
        backend.remove_item(ACCESS_TOKEN_KEY).await?;
        backend.remove_item(REFRESH_TOKEN_KEY).await?;
        backend.remove_item(USER_PROFILE_KEY).await
    }

    /// True iff both an access token and a cached profile are stored.
    /// Answers "am I logged in" without a network call.
    pub async fn has_stored_credentials(&self) -> AuthResult<bool> {
        let backend = self.backend().await;
        let token = backend.get_item(ACCESS_TOKEN_KEY).await?;
        let profile = backend.get_item(USER_PROFILE_KEY).await?;
        Ok(token.is_some() && profile.is_some())
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::claims::EmploymentStatus;

    fn memory_store() -> CredentialStore {
        CredentialStore::with_backend(Arc::new(MemoryBackend::new()))
    }

    fn profile() -> UserProfile {
        UserProfile {
            account_id: "acc-7".to_string(),
            name: "R. Dealer".to_string(),
            email: Some("r@example.com".to_string()),
            employment_status: EmploymentStatus::Active,
            role: None,
        }
    }

    #[tokio::test]
    async fn tokens_round_trip() {
        let store = memory_store();
        store.set_access_token("a.b.c").await.unwrap();
        store.set_refresh_token("d.e.f").await.unwrap();

        assert_eq!(store.access_token().await.unwrap(), Some("a.b.c".into()));
        assert_eq!(store.refresh_token().await.unwrap(), Some("d.e.f".into()));

        store.clear_access_token().await.unwrap();
        assert_eq!(store.access_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn profile_round_trips_through_json() {
        let store = memory_store();
        store.set_user_profile(&profile()).await.unwrap();
        assert_eq!(store.user_profile().await.unwrap(), Some(profile()));
    }

    #[tokio::test]
    async fn has_stored_credentials_requires_both() {
        let store = memory_store();
        assert!(!store.has_stored_credentials().await.unwrap());

        store.set_access_token("a.b.c").await.unwrap();
        assert!(!store.has_stored_credentials().await.unwrap());

        store.set_user_profile(&profile()).await.unwrap();
        assert!(store.has_stored_credentials().await.unwrap());
    }

    #[tokio::test]
    async fn clear_all_empties_every_entry() {
        let store = memory_store();
        store.set_access_token("a.b.c").await.unwrap();
        store.set_refresh_token("d.e.f").await.unwrap();
        store.set_user_profile(&profile()).await.unwrap();

        store.clear_all().await.unwrap();
        assert_eq!(store.access_token().await.unwrap(), None);
        assert_eq!(store.refresh_token().await.unwrap(), None);
        assert!(store.user_profile().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reads_issued_concurrently_with_first_use_are_not_dropped() {
        let store = Arc::new(memory_store());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.access_token().await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap().is_none());
        }
    }
}
