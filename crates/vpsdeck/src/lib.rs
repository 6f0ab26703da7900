//! vpsdeck wiring
//!
//! Registers the Linode and DigitalOcean adapters with a
//! [`ProviderFactory`] and assembles a [`ProviderHub`] from a settings file.

use std::sync::Arc;

use vpsdeck_cloud::{
    ClientOptions, DIGITALOCEAN_API_BASE, HttpVendorClient, LINODE_API_BASE, ProviderError,
    ProviderFactory, ProviderHub, ProviderType, ResourceCache, Result, VendorClient,
};
use vpsdeck_cloud_digitalocean::DigitalOceanProvider;
use vpsdeck_cloud_linode::LinodeProvider;
use vpsdeck_config::{FileDirectory, Settings};

/// Factory over the given vendor clients
pub fn factory_with_clients(
    cache: Arc<ResourceCache>,
    linode: Arc<dyn VendorClient>,
    digitalocean: Arc<dyn VendorClient>,
) -> Result<ProviderFactory> {
    ProviderFactory::builder(cache)
        .register(ProviderType::Linode, linode, LinodeProvider::boxed)
        .register(
            ProviderType::DigitalOcean,
            digitalocean,
            DigitalOceanProvider::boxed,
        )
        .build()
}

/// Factory talking to the real vendor APIs
pub fn default_factory(
    cache: Arc<ResourceCache>,
    options: &ClientOptions,
) -> Result<ProviderFactory> {
    let linode = http_client(ProviderType::Linode, LINODE_API_BASE, options)?;
    let digitalocean = http_client(ProviderType::DigitalOcean, DIGITALOCEAN_API_BASE, options)?;
    factory_with_clients(cache, linode, digitalocean)
}

fn http_client(
    provider_type: ProviderType,
    base_url: &str,
    options: &ClientOptions,
) -> Result<Arc<dyn VendorClient>> {
    let client = HttpVendorClient::new(base_url, options).map_err(|e| {
        ProviderError::api(provider_type, format!("Failed to build HTTP client: {}", e))
    })?;
    Ok(Arc::new(client))
}

/// Hub over the providers listed in `settings`, with the settings' cache
/// overrides applied
pub fn build_hub(settings: &Settings) -> Result<ProviderHub> {
    let cache = Arc::new(ResourceCache::new());
    let factory = default_factory(cache, &settings.client_options())?;
    Ok(hub_with_factory(settings, factory))
}

/// Hub over the providers listed in `settings`, using a prepared factory
pub fn hub_with_factory(settings: &Settings, factory: ProviderFactory) -> ProviderHub {
    settings.apply_cache(factory.cache());
    let directory = FileDirectory::from_settings(settings);
    tracing::debug!("Provider directory holds {} records", directory.records().len());
    ProviderHub::new(Arc::new(directory), factory)
}
