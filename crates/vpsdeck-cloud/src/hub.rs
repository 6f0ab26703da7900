//! Directory + factory glue
//!
//! Resolves a provider record and hands back a ready adapter, and keeps the
//! resource cache consistent when a provider's configuration changes.

use std::sync::Arc;

use crate::cache::ResourceKind;
use crate::directory::ProviderDirectory;
use crate::error::Result;
use crate::factory::ProviderFactory;
use crate::provider::ProviderService;
use crate::types::ProviderType;

#[derive(Clone)]
pub struct ProviderHub {
    directory: Arc<dyn ProviderDirectory>,
    factory: ProviderFactory,
}

impl ProviderHub {
    pub fn new(directory: Arc<dyn ProviderDirectory>, factory: ProviderFactory) -> Self {
        Self { directory, factory }
    }

    pub fn directory(&self) -> &Arc<dyn ProviderDirectory> {
        &self.directory
    }

    pub fn factory(&self) -> &ProviderFactory {
        &self.factory
    }

    /// Adapter for an active provider record
    pub async fn service(&self, provider_id: &str) -> Result<Arc<dyn ProviderService>> {
        let record = self.directory.resolve(provider_id).await?;
        self.factory
            .create_for(record.provider_type, &record.credential, Some(&record.id))
    }

    /// Adapter for the first active record of a vendor
    pub async fn active_service(&self, provider_type: ProviderType) -> Result<Arc<dyn ProviderService>> {
        let record = self.directory.resolve_active_by_type(provider_type).await?;
        self.factory
            .create_for(record.provider_type, &record.credential, Some(&record.id))
    }

    /// Call after a provider record was edited, disabled or deleted
    pub fn provider_changed(&self, provider_id: &str) {
        tracing::info!("Provider {} changed, dropping cached catalogs", provider_id);
        self.factory.cache().invalidate_provider(provider_id);
    }

    /// Operator-forced refresh of one kind, or all kinds
    pub fn refresh(&self, provider_id: &str, kind: Option<ResourceKind>) {
        match kind {
            Some(kind) => self.factory.cache().invalidate(provider_id, kind),
            None => self.factory.cache().invalidate_provider(provider_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResourceCache;
    use crate::client::HttpMethod;
    use crate::directory::{MemoryDirectory, ProviderRecord};
    use crate::error::ErrorCode;
    use crate::mock::MockVendorClient;
    use crate::provider::tests::{StubService, plans_json};

    fn hub() -> (ProviderHub, Arc<MockVendorClient>, Arc<MemoryDirectory>) {
        let client = Arc::new(MockVendorClient::new());
        client.ok(HttpMethod::Get, "/plans", plans_json());
        let factory = ProviderFactory::builder(Arc::new(ResourceCache::new()))
            .register(ProviderType::Linode, client.clone(), StubService::boxed)
            .register(ProviderType::DigitalOcean, client.clone(), StubService::boxed)
            .build()
            .unwrap();
        let directory = Arc::new(MemoryDirectory::with_records([
            ProviderRecord::new("lin-1", ProviderType::Linode, "tok"),
            ProviderRecord::new("do-1", ProviderType::DigitalOcean, "tok").inactive(),
        ]));
        (ProviderHub::new(directory.clone(), factory), client, directory)
    }

    #[tokio::test]
    async fn test_service_carries_record_id() {
        let (hub, _, _) = hub();
        let service = hub.service("lin-1").await.unwrap();
        assert_eq!(service.provider_id(), Some("lin-1"));

        let service = hub.active_service(ProviderType::Linode).await.unwrap();
        assert_eq!(service.provider_id(), Some("lin-1"));
    }

    #[tokio::test]
    async fn test_inactive_and_missing_records() {
        let (hub, _, directory) = hub();

        let err = hub.service("do-1").await.err().unwrap();
        assert_eq!(err.code, ErrorCode::ProviderInactive);
        let err = hub.service("gone").await.err().unwrap();
        assert_eq!(err.code, ErrorCode::ProviderNotFound);

        assert!(directory.set_active("do-1", true));
        assert!(hub.service("do-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_provider_changed_drops_cached_catalogs() {
        let (hub, client, _) = hub();
        let service = hub.service("lin-1").await.unwrap();

        service.get_plans().await.unwrap();
        service.get_plans().await.unwrap();
        assert_eq!(client.calls_to("/plans"), 1);

        hub.provider_changed("lin-1");
        service.get_plans().await.unwrap();
        assert_eq!(client.calls_to("/plans"), 2);

        hub.refresh("lin-1", Some(ResourceKind::Images));
        service.get_plans().await.unwrap();
        assert_eq!(client.calls_to("/plans"), 2);

        hub.refresh("lin-1", Some(ResourceKind::Plans));
        service.get_plans().await.unwrap();
        assert_eq!(client.calls_to("/plans"), 3);
    }
}
