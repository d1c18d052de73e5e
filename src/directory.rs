//! Interface to the employee data store. Persistence itself is out of
//! scope for this crate; deployments plug in their own directory, the
//! in-memory implementation backs development and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{AuthError, AuthResult};
use crate::models::claims::EmploymentStatus;

#[derive(Debug, Clone)]
pub struct EmployeeRecord {
    /// Human-readable account id (employee code), the token subject.
    pub subject: String,
    pub account_id: String,
    pub name: String,
    pub email: Option<String>,
    pub employment_status: EmploymentStatus,
    pub role: Option<String>,
}

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Resolves an identifier/secret pair. `None` means unknown
    /// identifier or wrong secret; the two are indistinguishable.
    async fn verify_credentials(
        &self,
        identifier: &str,
        secret: &str,
    ) -> AuthResult<Option<EmployeeRecord>>;

    async fn find_by_account_id(&self, account_id: &str) -> AuthResult<Option<EmployeeRecord>>;

    /// Current employment status, which may have changed since any
    /// token was issued.
    async fn employment_status(&self, account_id: &str) -> AuthResult<Option<EmploymentStatus>> {
        Ok(self
            .find_by_account_id(account_id)
            .await?
            .map(|r| r.employment_status))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    // identifier -> (secret, record)
    accounts: RwLock<HashMap<String, (String, EmployeeRecord)>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, identifier: &str, secret: &str, record: EmployeeRecord) {
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.insert(identifier.to_string(), (secret.to_string(), record));
        }
    }

    pub fn set_status(&self, account_id: &str, status: EmploymentStatus) {
        if let Ok(mut accounts) = self.accounts.write() {
            for (_, record) in accounts.values_mut() {
                if record.account_id == account_id {
                    record.employment_status = status;
                }
            }
        }
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryDirectory {
    async fn verify_credentials(
        &self,
        identifier: &str,
        secret: &str,
    ) -> AuthResult<Option<EmployeeRecord>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|e| AuthError::Internal(format!("Directory lock poisoned: {}", e)))?;
        Ok(accounts
            .get(identifier)
            .filter(|(stored_secret, _)| stored_secret == secret)
            .map(|(_, record)| record.clone()))
    }

    async fn find_by_account_id(&self, account_id: &str) -> AuthResult<Option<EmployeeRecord>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|e| AuthError::Internal(format!("Directory lock poisoned: {}", e)))?;
        Ok(accounts
            .values()
            .find(|(_, record)| record.account_id == account_id)
            .map(|(_, record)| record.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: EmploymentStatus) -> EmployeeRecord {
        EmployeeRecord {
            subject: "EMP-1".to_string(),
            account_id: "acc-1".to_string(),
            name: "T. Officer".to_string(),
            email: None,
            employment_status: status,
            role: None,
        }
    }

    #[tokio::test]
    async fn wrong_secret_and_unknown_identifier_are_indistinguishable() {
        let dir = InMemoryDirectory::new();
        dir.insert("EMP-1", "s3cret", record(EmploymentStatus::Active));

        let wrong = dir.verify_credentials("EMP-1", "nope").await.unwrap();
        let unknown = dir.verify_credentials("EMP-2", "s3cret").await.unwrap();
        assert!(wrong.is_none());
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn status_reflects_later_mutations() {
        let dir = InMemoryDirectory::new();
        dir.insert("EMP-1", "s3cret", record(EmploymentStatus::Active));
        dir.set_status("acc-1", EmploymentStatus::Suspended);

        let status = dir.employment_status("acc-1").await.unwrap();
        assert_eq!(status, Some(EmploymentStatus::Suspended));
    }
}
