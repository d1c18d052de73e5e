use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::AuthResult;

/// One credential medium. Every medium behaves identically from the
/// store's point of view; capability differences are resolved once at
/// initialization, never at call sites.
#[async_trait]
pub trait CredentialBackend: Send + Sync + Debug {
    async fn set_item(&self, key: &str, value: &str) -> AuthResult<()>;
    async fn get_item(&self, key: &str) -> AuthResult<Option<String>>;
    async fn remove_item(&self, key: &str) -> AuthResult<()>;
}
