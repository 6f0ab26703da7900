//! DigitalOcean provider implementation

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use vpsdeck_cloud::{
    CreateInstanceParams, InstanceAction, InstanceSpecs, InstanceStatus, MarketplaceApp,
    ProviderContext, ProviderImage, ProviderInstance, ProviderPlan, ProviderRegion,
    ProviderError, ProviderService, ProviderType, Result, VendorExtras,
};

use crate::api::{CreateDropletRequest, DigitalOceanApi, Droplet, Image, OneClick, Region, Size};
use crate::cloud_init;

/// Map a droplet status
pub fn map_status(status: &str) -> InstanceStatus {
    match status {
        "new" => InstanceStatus::Provisioning,
        "active" => InstanceStatus::Running,
        "off" => InstanceStatus::Stopped,
        _ => InstanceStatus::Unknown,
    }
}

/// Droplet action `type` for an action, `None` for delete
fn action_type(action: InstanceAction) -> Option<&'static str> {
    match action {
        InstanceAction::Boot => Some("power_on"),
        InstanceAction::Shutdown => Some("shutdown"),
        InstanceAction::PowerOff => Some("power_off"),
        InstanceAction::Reboot => Some("reboot"),
        InstanceAction::PowerCycle => Some("power_cycle"),
        InstanceAction::Delete => None,
    }
}

fn tb_to_gb(tb: f64) -> u64 {
    (tb * 1000.0).round() as u64
}

/// Country of a datacenter, from its slug prefix
fn region_country(slug: &str) -> Option<String> {
    let country = match slug.trim_end_matches(|c: char| c.is_ascii_digit()) {
        "nyc" | "sfo" | "atl" => "us",
        "tor" => "ca",
        "ams" => "nl",
        "fra" => "de",
        "lon" => "gb",
        "sgp" => "sg",
        "blr" => "in",
        "syd" => "au",
        _ => return None,
    };
    Some(country.to_string())
}

impl From<Droplet> for ProviderInstance {
    fn from(droplet: Droplet) -> Self {
        let (public, private): (Vec<_>, Vec<_>) =
            droplet.networks.v4.into_iter().partition(|a| a.is_public());
        let ipv4 = public
            .into_iter()
            .chain(private)
            .map(|a| a.ip_address)
            .collect();
        let ipv6 = droplet
            .networks
            .v6
            .iter()
            .find(|a| a.is_public())
            .or_else(|| droplet.networks.v6.first())
            .map(|a| a.ip_address.clone());

        Self {
            id: droplet.id.to_string(),
            label: droplet.name,
            status: map_status(&droplet.status),
            ipv4,
            ipv6,
            region: droplet.region.map(|r| r.slug).unwrap_or_default(),
            specs: InstanceSpecs {
                vcpus: droplet.vcpus,
                memory_mb: droplet.memory,
                disk_gb: droplet.disk,
                transfer_gb: droplet.size.map(|s| tb_to_gb(s.transfer)).unwrap_or(0),
            },
            created: droplet.created_at,
            image: droplet.image.and_then(|i| i.slug.or(i.name)),
            tags: Some(droplet.tags),
        }
    }
}

impl From<Size> for ProviderPlan {
    fn from(size: Size) -> Self {
        Self {
            label: size.slug.clone(),
            id: size.slug,
            vcpus: size.vcpus,
            memory_mb: size.memory,
            disk_gb: size.disk,
            transfer_gb: tb_to_gb(size.transfer),
            price_monthly: size.price_monthly,
            price_hourly: size.price_hourly,
            regions: size.regions,
            class: size.description,
        }
    }
}

impl From<Image> for ProviderImage {
    fn from(image: Image) -> Self {
        let label = match &image.distribution {
            Some(distribution) => format!("{} {}", distribution, image.name),
            None => image.name.clone(),
        };
        Self {
            id: image.slug.unwrap_or_else(|| image.id.to_string()),
            label,
            distribution: image.distribution,
            deprecated: image.status.as_deref().is_some_and(|s| s != "available"),
            min_disk_gb: image.min_disk_size,
            public: image.public,
        }
    }
}

impl From<Region> for ProviderRegion {
    fn from(region: Region) -> Self {
        Self {
            country: region_country(&region.slug),
            id: region.slug,
            label: region.name,
            available: region.available,
            capabilities: region.features,
        }
    }
}

impl From<OneClick> for MarketplaceApp {
    fn from(app: OneClick) -> Self {
        Self {
            label: app.slug.clone(),
            id: app.slug,
            description: None,
            provider_type: ProviderType::DigitalOcean,
        }
    }
}

/// Raw OpenSSH public key, as opposed to a key ID or fingerprint
fn is_public_key(key: &str) -> bool {
    let key = key.trim_start();
    ["ssh-", "ecdsa-", "sk-"]
        .iter()
        .any(|prefix| key.starts_with(prefix))
}

/// DigitalOcean provider
#[derive(Debug, Clone)]
pub struct DigitalOceanProvider {
    api: DigitalOceanApi,
}

impl DigitalOceanProvider {
    pub fn new(ctx: ProviderContext) -> Self {
        Self {
            api: DigitalOceanApi::new(ctx),
        }
    }

    /// Constructor for the provider registry
    pub fn boxed(ctx: ProviderContext) -> Arc<dyn ProviderService> {
        Arc::new(Self::new(ctx))
    }

    pub fn api(&self) -> &DigitalOceanApi {
        &self.api
    }

    fn build_create_request(&self, params: &CreateInstanceParams) -> Result<CreateDropletRequest> {
        params.check_extras(ProviderType::DigitalOcean)?;
        if params.ssh_keys.iter().any(|key| is_public_key(key)) {
            return Err(ProviderError::validation(
                ProviderType::DigitalOcean,
                "ssh_keys",
                "DigitalOcean expects SSH key IDs or fingerprints, not public keys",
            ));
        }

        let (marketplace_app, user_data, backups, monitoring) = match &params.extras {
            VendorExtras::DigitalOcean {
                marketplace_app,
                user_data,
                backups,
                monitoring,
            } => (
                marketplace_app.as_deref(),
                user_data.as_deref(),
                *backups,
                *monitoring,
            ),
            _ => (None, None, false, false),
        };

        Ok(CreateDropletRequest {
            name: params.label.clone(),
            region: params.region.clone(),
            size: params.plan.clone(),
            image: marketplace_app.unwrap_or(&params.image).to_string(),
            ssh_keys: params.ssh_keys.clone(),
            tags: params.tags.clone(),
            backups,
            monitoring,
            user_data: cloud_init::resolve_user_data(user_data, params.root_password.as_deref()),
        })
    }

    async fn fetch_plans(&self) -> Result<Vec<ProviderPlan>> {
        let sizes = self.api.list_sizes().await?;
        Ok(sizes
            .into_iter()
            .filter(|s| s.available)
            .map(Into::into)
            .collect())
    }

    async fn fetch_images(&self) -> Result<Vec<ProviderImage>> {
        let images = self.api.list_images().await?;
        Ok(images.into_iter().map(Into::into).collect())
    }

    async fn fetch_regions(&self) -> Result<Vec<ProviderRegion>> {
        let regions = self.api.list_regions().await?;
        Ok(regions.into_iter().map(Into::into).collect())
    }

    async fn fetch_marketplace_apps(&self) -> Result<Vec<MarketplaceApp>> {
        let apps = self.api.list_one_clicks().await?;
        Ok(apps.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ProviderService for DigitalOceanProvider {
    fn context(&self) -> &ProviderContext {
        self.api.context()
    }

    async fn create_instance(&self, params: &CreateInstanceParams) -> Result<ProviderInstance> {
        self.context().ensure_credential()?;
        let request = self.build_create_request(params)?;

        tracing::info!(
            "Creating droplet {} ({} in {})",
            request.name,
            request.size,
            request.region
        );
        let droplet = self.api.create_droplet(&request).await?;
        tracing::info!("Droplet {} created with id {}", droplet.name, droplet.id);

        Ok(droplet.into())
    }

    async fn get_instance(&self, id: &str) -> Result<ProviderInstance> {
        Ok(self.api.get_droplet(id).await?.into())
    }

    async fn list_instances(&self) -> Result<Vec<ProviderInstance>> {
        let droplets = self.api.list_droplets().await?;
        Ok(droplets.into_iter().map(Into::into).collect())
    }

    async fn perform_action(
        &self,
        id: &str,
        action: InstanceAction,
        params: Option<&Value>,
    ) -> Result<()> {
        self.context().ensure_credential()?;

        match action_type(action) {
            Some(kind) => {
                tracing::info!("Droplet {}: {} requested", id, kind);
                self.api.droplet_action(id, kind, params).await
            }
            None => {
                tracing::info!("Deleting droplet {}", id);
                self.api.delete_droplet(id).await
            }
        }
    }

    async fn get_plans(&self) -> Result<Vec<ProviderPlan>> {
        self.context().cached(|| self.fetch_plans()).await
    }

    async fn get_images(&self) -> Result<Vec<ProviderImage>> {
        self.context().cached(|| self.fetch_images()).await
    }

    async fn get_regions(&self) -> Result<Vec<ProviderRegion>> {
        self.context().cached(|| self.fetch_regions()).await
    }

    async fn get_marketplace_apps(&self) -> Result<Vec<MarketplaceApp>> {
        self.context().cached(|| self.fetch_marketplace_apps()).await
    }

    async fn validate_credentials(&self) -> bool {
        if !self.context().has_credential() {
            return false;
        }
        match self.api.account().await {
            Ok(account) => {
                tracing::debug!(
                    "DigitalOcean token valid (account status {:?})",
                    account.status
                );
                true
            }
            Err(e) => {
                tracing::debug!("DigitalOcean credential check failed: {}", e);
                false
            }
        }
    }
}
