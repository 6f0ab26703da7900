//! Provider registry
//!
//! Maps each implemented [`ProviderType`] to the vendor client and the
//! constructor of its adapter. The registry is checked once at build time
//! against [`ProviderType::SUPPORTED`], so a missing or stray registration
//! is a startup error instead of a runtime surprise.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::ResourceCache;
use crate::client::VendorClient;
use crate::error::{ErrorCode, ProviderError, Result};
use crate::provider::{ProviderContext, ProviderService};
use crate::types::ProviderType;

/// Builds an adapter from its context
pub type ProviderConstructor =
    Arc<dyn Fn(ProviderContext) -> Arc<dyn ProviderService> + Send + Sync>;

#[derive(Clone)]
struct Registration {
    client: Arc<dyn VendorClient>,
    constructor: ProviderConstructor,
}

/// Registry of adapters sharing one [`ResourceCache`]
#[derive(Clone)]
pub struct ProviderFactory {
    cache: Arc<ResourceCache>,
    registry: HashMap<ProviderType, Registration>,
}

impl std::fmt::Debug for ProviderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<_> = self.registry.keys().collect();
        registered.sort();
        f.debug_struct("ProviderFactory")
            .field("registered", &registered)
            .finish()
    }
}

impl ProviderFactory {
    pub fn builder(cache: Arc<ResourceCache>) -> ProviderFactoryBuilder {
        ProviderFactoryBuilder {
            cache,
            registry: HashMap::new(),
        }
    }

    /// Every vendor the rest of the system may offer
    pub fn supported_providers() -> Vec<ProviderType> {
        ProviderType::SUPPORTED.to_vec()
    }

    /// Whether `tag` names an implemented vendor
    pub fn is_supported(tag: &str) -> bool {
        tag.parse::<ProviderType>()
            .map(|ty| ty.is_implemented())
            .unwrap_or(false)
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    /// Build an adapter from a vendor tag
    pub fn create(
        &self,
        tag: &str,
        credential: &str,
        provider_id: Option<&str>,
    ) -> Result<Arc<dyn ProviderService>> {
        let provider_type: ProviderType = tag.parse()?;
        self.create_for(provider_type, credential, provider_id)
    }

    /// Build an adapter for a known vendor
    pub fn create_for(
        &self,
        provider_type: ProviderType,
        credential: &str,
        provider_id: Option<&str>,
    ) -> Result<Arc<dyn ProviderService>> {
        let registration = self.registry.get(&provider_type).ok_or_else(|| {
            ProviderError::new(
                ErrorCode::ProviderNotImplemented,
                format!("Provider not yet implemented: {}", provider_type),
                provider_type.as_str(),
            )
        })?;

        tracing::debug!(
            "Creating {} adapter for provider {}",
            provider_type,
            provider_id.unwrap_or("-")
        );

        let context = ProviderContext::new(
            provider_type,
            credential,
            provider_id.map(str::to_string),
            Arc::clone(&self.cache),
            Arc::clone(&registration.client),
        );
        Ok((registration.constructor)(context))
    }
}

/// Collects registrations before validating them
pub struct ProviderFactoryBuilder {
    cache: Arc<ResourceCache>,
    registry: HashMap<ProviderType, Registration>,
}

impl ProviderFactoryBuilder {
    /// Register (or replace) the adapter for a vendor
    pub fn register<F>(
        mut self,
        provider_type: ProviderType,
        client: Arc<dyn VendorClient>,
        constructor: F,
    ) -> Self
    where
        F: Fn(ProviderContext) -> Arc<dyn ProviderService> + Send + Sync + 'static,
    {
        self.registry.insert(
            provider_type,
            Registration {
                client,
                constructor: Arc::new(constructor),
            },
        );
        self
    }

    /// Check the registry covers exactly the supported vendors
    pub fn build(self) -> Result<ProviderFactory> {
        for provider_type in ProviderType::SUPPORTED {
            if !self.registry.contains_key(&provider_type) {
                return Err(ProviderError::new(
                    ErrorCode::ProviderNotImplemented,
                    format!("No adapter registered for {}", provider_type),
                    provider_type.as_str(),
                ));
            }
        }
        if let Some(stray) = self.registry.keys().find(|ty| !ty.is_implemented()) {
            return Err(ProviderError::new(
                ErrorCode::UnsupportedProvider,
                format!("Adapter registered for unsupported provider: {}", stray),
                stray.as_str(),
            ));
        }

        Ok(ProviderFactory {
            cache: self.cache,
            registry: self.registry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockVendorClient;
    use crate::provider::tests::StubService;

    fn client() -> Arc<dyn VendorClient> {
        Arc::new(MockVendorClient::new())
    }

    fn factory() -> ProviderFactory {
        ProviderFactory::builder(Arc::new(ResourceCache::new()))
            .register(ProviderType::Linode, client(), StubService::boxed)
            .register(ProviderType::DigitalOcean, client(), StubService::boxed)
            .build()
            .unwrap()
    }

    #[test]
    fn test_supported_providers() {
        assert_eq!(
            ProviderFactory::supported_providers(),
            vec![ProviderType::Linode, ProviderType::DigitalOcean]
        );
        assert!(ProviderFactory::is_supported(" LINODE "));
        assert!(!ProviderFactory::is_supported("hetzner"));
        assert!(!ProviderFactory::is_supported("aws"));
    }

    #[test]
    fn test_create_passes_context() {
        let service = factory().create("digitalocean", "tok", Some("p1")).unwrap();
        assert_eq!(service.provider_type(), ProviderType::DigitalOcean);
        assert_eq!(service.provider_id(), Some("p1"));
        assert!(service.context().has_credential());
    }

    #[test]
    fn test_create_unknown_and_unimplemented() {
        let factory = factory();

        let err = factory.create("ovh", "tok", None).err().unwrap();
        assert_eq!(err.code, ErrorCode::UnsupportedProvider);
        assert_eq!(err.provider, "ovh");

        let err = factory.create("hetzner", "tok", None).err().unwrap();
        assert_eq!(err.code, ErrorCode::ProviderNotImplemented);
        assert_eq!(err.message, "Provider not yet implemented: hetzner");
    }

    #[test]
    fn test_build_requires_every_supported_vendor() {
        let err = ProviderFactory::builder(Arc::new(ResourceCache::new()))
            .register(ProviderType::Linode, client(), StubService::boxed)
            .build()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProviderNotImplemented);
        assert_eq!(err.provider, "digitalocean");
    }

    #[test]
    fn test_build_rejects_reserved_vendor() {
        let err = ProviderFactory::builder(Arc::new(ResourceCache::new()))
            .register(ProviderType::Linode, client(), StubService::boxed)
            .register(ProviderType::DigitalOcean, client(), StubService::boxed)
            .register(ProviderType::Vultr, client(), StubService::boxed)
            .build()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedProvider);
    }

    #[test]
    fn test_debug_lists_registrations() {
        let debug = format!("{:?}", factory());
        assert!(debug.contains("Linode"));
        assert!(debug.contains("DigitalOcean"));
    }
}
