//! Linode provider implementation

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use vpsdeck_cloud::{
    CreateInstanceParams, InstanceAction, InstanceSpecs, InstanceStatus, MarketplaceApp,
    ProviderContext, ProviderError, ProviderImage, ProviderInstance, ProviderPlan,
    ProviderRegion, ProviderService, ProviderType, Result, VendorExtras,
};

use crate::api::{
    CreateLinodeRequest, LinodeApi, LinodeImage, LinodeInstance, LinodeRegion, LinodeType,
    StackScript,
};

/// Map a Linode instance status
pub fn map_status(status: &str) -> InstanceStatus {
    match status {
        "running" => InstanceStatus::Running,
        "offline" | "stopped" | "shutting_down" => InstanceStatus::Stopped,
        "provisioning" | "booting" | "migrating" | "rebuilding" | "cloning" | "restoring"
        | "resizing" => InstanceStatus::Provisioning,
        "rebooting" => InstanceStatus::Rebooting,
        _ => InstanceStatus::Unknown,
    }
}

fn mb_to_gb(mb: u64) -> u64 {
    mb / 1024
}

/// `2600:3c00::f03c:91ff:fe24:3a2f/128` → `2600:3c00::f03c:91ff:fe24:3a2f`
fn strip_prefix_len(address: &str) -> String {
    address
        .split_once('/')
        .map(|(addr, _)| addr)
        .unwrap_or(address)
        .to_string()
}

impl From<LinodeInstance> for ProviderInstance {
    fn from(linode: LinodeInstance) -> Self {
        Self {
            id: linode.id.to_string(),
            label: linode.label,
            status: map_status(&linode.status),
            ipv4: linode.ipv4,
            ipv6: linode.ipv6.as_deref().map(strip_prefix_len),
            region: linode.region,
            specs: InstanceSpecs {
                vcpus: linode.specs.vcpus,
                memory_mb: linode.specs.memory,
                disk_gb: mb_to_gb(linode.specs.disk),
                transfer_gb: linode.specs.transfer,
            },
            created: linode.created,
            image: linode.image,
            tags: Some(linode.tags),
        }
    }
}

impl From<LinodeType> for ProviderPlan {
    fn from(ty: LinodeType) -> Self {
        Self {
            id: ty.id,
            label: ty.label,
            vcpus: ty.vcpus,
            memory_mb: ty.memory,
            disk_gb: mb_to_gb(ty.disk),
            transfer_gb: ty.transfer,
            price_monthly: ty.price.monthly,
            price_hourly: ty.price.hourly,
            regions: Vec::new(),
            class: ty.class,
        }
    }
}

impl From<LinodeImage> for ProviderImage {
    fn from(image: LinodeImage) -> Self {
        Self {
            id: image.id,
            label: image.label,
            distribution: image.vendor,
            deprecated: image.deprecated,
            min_disk_gb: (image.size > 0).then(|| image.size.div_ceil(1024)),
            public: image.is_public,
        }
    }
}

impl From<LinodeRegion> for ProviderRegion {
    fn from(region: LinodeRegion) -> Self {
        Self {
            label: region.label.unwrap_or_else(|| region.id.clone()),
            id: region.id,
            country: region.country,
            available: region.status.as_deref() == Some("ok"),
            capabilities: region.capabilities,
        }
    }
}

impl From<StackScript> for MarketplaceApp {
    fn from(script: StackScript) -> Self {
        Self {
            id: script.id.to_string(),
            label: script.label,
            description: script.description,
            provider_type: ProviderType::Linode,
        }
    }
}

/// Linode provider
#[derive(Debug, Clone)]
pub struct LinodeProvider {
    api: LinodeApi,
}

impl LinodeProvider {
    pub fn new(ctx: ProviderContext) -> Self {
        Self {
            api: LinodeApi::new(ctx),
        }
    }

    /// Constructor for the provider registry
    pub fn boxed(ctx: ProviderContext) -> Arc<dyn ProviderService> {
        Arc::new(Self::new(ctx))
    }

    pub fn api(&self) -> &LinodeApi {
        &self.api
    }

    fn build_create_request(&self, params: &CreateInstanceParams) -> Result<CreateLinodeRequest> {
        params.check_extras(ProviderType::Linode)?;

        let root_pass = params
            .root_password
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                ProviderError::validation(
                    ProviderType::Linode,
                    "root_password",
                    "A root password is required to deploy a Linode image",
                )
            })?;

        let (stackscript_id, stackscript_data) = match &params.extras {
            VendorExtras::Linode {
                stackscript_id,
                stackscript_data,
            } => (*stackscript_id, stackscript_data.clone()),
            _ => (None, Default::default()),
        };

        Ok(CreateLinodeRequest {
            label: params.label.clone(),
            plan: params.plan.clone(),
            region: params.region.clone(),
            image: params.image.clone(),
            root_pass,
            authorized_keys: params.ssh_keys.clone(),
            tags: params.tags.clone(),
            stackscript_id,
            stackscript_data,
            booted: true,
        })
    }

    async fn fetch_plans(&self) -> Result<Vec<ProviderPlan>> {
        let types = self.api.list_types().await?;
        Ok(types.into_iter().map(Into::into).collect())
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
        let scripts = self.api.list_stackscripts().await?;
        Ok(scripts.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ProviderService for LinodeProvider {
    fn context(&self) -> &ProviderContext {
        self.api.context()
    }

    async fn create_instance(&self, params: &CreateInstanceParams) -> Result<ProviderInstance> {
        self.context().ensure_credential()?;
        let request = self.build_create_request(params)?;

        tracing::info!(
            "Creating Linode {} ({} in {})",
            request.label,
            request.plan,
            request.region
        );
        let linode = self.api.create_linode(&request).await?;
        tracing::info!("Linode {} created with id {}", linode.label, linode.id);

        Ok(linode.into())
    }

    async fn get_instance(&self, id: &str) -> Result<ProviderInstance> {
        Ok(self.api.get_linode(id).await?.into())
    }

    async fn list_instances(&self) -> Result<Vec<ProviderInstance>> {
        let linodes = self.api.list_linodes().await?;
        Ok(linodes.into_iter().map(Into::into).collect())
    }

    async fn perform_action(
        &self,
        id: &str,
        action: InstanceAction,
        params: Option<&Value>,
    ) -> Result<()> {
        self.context().ensure_credential()?;

        let endpoint = match action {
            InstanceAction::Boot => "boot",
            // Linode has no hard power off; shutdown is the closest
            InstanceAction::Shutdown | InstanceAction::PowerOff => "shutdown",
            InstanceAction::Reboot => "reboot",
            InstanceAction::PowerCycle => {
                return Err(ProviderError::invalid_action(
                    ProviderType::Linode,
                    action.as_str(),
                ));
            }
            InstanceAction::Delete => {
                tracing::info!("Deleting Linode {}", id);
                return self.api.delete_linode(id).await;
            }
        };

        tracing::info!("Linode {}: {} requested", id, action);
        self.api.instance_action(id, endpoint, params).await
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
        match self.api.profile().await {
            Ok(profile) => {
                tracing::debug!("Linode token belongs to {}", profile.username);
                true
            }
            Err(e) => {
                tracing::debug!("Linode credential check failed: {}", e);
                false
            }
        }
    }
}
