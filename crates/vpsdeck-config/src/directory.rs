//! Provider directory backed by the settings file

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use vpsdeck_cloud::{ProviderDirectory, ProviderRecord};

use crate::error::Result;
use crate::settings::Settings;

/// Provider records read from a settings file. Tokens are resolved once, at
/// load time.
#[derive(Debug, Clone, Default)]
pub struct FileDirectory {
    source: Option<PathBuf>,
    records: Vec<ProviderRecord>,
}

impl FileDirectory {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            source: None,
            records: settings.providers.iter().map(|p| p.to_record()).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let settings = Settings::load(path)?;
        Ok(Self {
            source: Some(path.to_path_buf()),
            ..Self::from_settings(&settings)
        })
    }

    /// File the records came from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn records(&self) -> &[ProviderRecord] {
        &self.records
    }
}

#[async_trait]
impl ProviderDirectory for FileDirectory {
    async fn list(&self) -> vpsdeck_cloud::Result<Vec<ProviderRecord>> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use vpsdeck_cloud::{ErrorCode, ProviderType};

    #[tokio::test]
    async fn test_file_directory_resolves() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("vpsdeck.yaml");
        fs::write(
            &path,
            "providers:\n  - {id: do-main, type: digitalocean, token: t1}\n  - {id: lin-off, type: linode, token: t2, active: false}\n",
        )
        .unwrap();

        let directory = FileDirectory::load(&path).unwrap();
        assert_eq!(directory.source(), Some(path.as_path()));

        let record = directory.resolve("do-main").await.unwrap();
        assert_eq!(record.credential, "t1");

        let record = directory
            .resolve_active_by_type(ProviderType::DigitalOcean)
            .await
            .unwrap();
        assert_eq!(record.id, "do-main");

        let err = directory.resolve("lin-off").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProviderInactive);

        let err = directory.resolve("nope").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProviderNotFound);
    }
}
