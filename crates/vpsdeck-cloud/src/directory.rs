//! Provider directory
//!
//! Where provider records (vendor, credential, active flag) live. The
//! subsystem only reads from it; persistence belongs to the implementation.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ErrorCode, ProviderError, Result};
use crate::types::ProviderType;

/// A configured provider account
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: String,
    pub provider_type: ProviderType,
    pub credential: String,
    pub active: bool,
    pub label: Option<String>,
}

impl std::fmt::Debug for ProviderRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRecord")
            .field("id", &self.id)
            .field("provider_type", &self.provider_type)
            .field("credential", &"<redacted>")
            .field("active", &self.active)
            .field("label", &self.label)
            .finish()
    }
}

impl ProviderRecord {
    pub fn new(
        id: impl Into<String>,
        provider_type: ProviderType,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            provider_type,
            credential: credential.into(),
            active: true,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

pub fn provider_not_found(id: &str) -> ProviderError {
    ProviderError::new(
        ErrorCode::ProviderNotFound,
        format!("Provider not found: {}", id),
        id,
    )
}

pub fn provider_inactive(record: &ProviderRecord) -> ProviderError {
    ProviderError::new(
        ErrorCode::ProviderInactive,
        format!("Provider is inactive: {}", record.id),
        record.id.as_str(),
    )
}

/// Source of provider records
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// Every record, active or not
    async fn list(&self) -> Result<Vec<ProviderRecord>>;

    /// Active record by id. Fails with `PROVIDER_NOT_FOUND` or
    /// `PROVIDER_INACTIVE`.
    async fn resolve(&self, provider_id: &str) -> Result<ProviderRecord> {
        let record = self
            .list()
            .await?
            .into_iter()
            .find(|r| r.id == provider_id)
            .ok_or_else(|| provider_not_found(provider_id))?;
        if !record.active {
            return Err(provider_inactive(&record));
        }
        Ok(record)
    }

    /// First active record of a vendor
    async fn resolve_active_by_type(&self, provider_type: ProviderType) -> Result<ProviderRecord> {
        let records: Vec<_> = self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.provider_type == provider_type)
            .collect();

        match records.iter().find(|r| r.active) {
            Some(record) => Ok(record.clone()),
            None => match records.first() {
                Some(record) => Err(provider_inactive(record)),
                None => Err(provider_not_found(provider_type.as_str())),
            },
        }
    }
}

/// In-memory directory, ordered by id
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    records: RwLock<BTreeMap<String, ProviderRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = ProviderRecord>) -> Self {
        let directory = Self::new();
        for record in records {
            directory.upsert(record);
        }
        directory
    }

    pub fn upsert(&self, record: ProviderRecord) {
        self.records.write().insert(record.id.clone(), record);
    }

    pub fn remove(&self, provider_id: &str) -> Option<ProviderRecord> {
        self.records.write().remove(provider_id)
    }

    /// Returns false when the record does not exist
    pub fn set_active(&self, provider_id: &str, active: bool) -> bool {
        match self.records.write().get_mut(provider_id) {
            Some(record) => {
                record.active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ProviderDirectory for MemoryDirectory {
    async fn list(&self) -> Result<Vec<ProviderRecord>> {
        Ok(self.records.read().values().cloned().collect())
    }
}
