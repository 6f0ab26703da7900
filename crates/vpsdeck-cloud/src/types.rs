//! Normalized, vendor-agnostic resource shapes

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorCode, ProviderError};

/// Vendor tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Linode,
    DigitalOcean,
    /// Reserved, no adapter yet
    Vultr,
    /// Reserved, no adapter yet
    Hetzner,
}

impl ProviderType {
    pub const ALL: [ProviderType; 4] = [
        ProviderType::Linode,
        ProviderType::DigitalOcean,
        ProviderType::Vultr,
        ProviderType::Hetzner,
    ];

    /// Vendors with a working adapter. This list is what the rest of the
    /// system may offer to callers.
    pub const SUPPORTED: [ProviderType; 2] = [ProviderType::Linode, ProviderType::DigitalOcean];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Linode => "linode",
            ProviderType::DigitalOcean => "digitalocean",
            ProviderType::Vultr => "vultr",
            ProviderType::Hetzner => "hetzner",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderType::Linode => "Linode",
            ProviderType::DigitalOcean => "DigitalOcean",
            ProviderType::Vultr => "Vultr",
            ProviderType::Hetzner => "Hetzner",
        }
    }

    pub fn is_implemented(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        ProviderType::ALL
            .into_iter()
            .find(|p| p.as_str() == tag)
            .ok_or_else(|| {
                ProviderError::new(
                    ErrorCode::UnsupportedProvider,
                    format!("Unknown provider type: {}", s),
                    s,
                )
            })
    }
}

/// Instance power/lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Running,
    Stopped,
    Provisioning,
    Rebooting,
    Error,
    Unknown,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceStatus::Running => write!(f, "running"),
            InstanceStatus::Stopped => write!(f, "stopped"),
            InstanceStatus::Provisioning => write!(f, "provisioning"),
            InstanceStatus::Rebooting => write!(f, "rebooting"),
            InstanceStatus::Error => write!(f, "error"),
            InstanceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Hardware shape of an instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpecs {
    pub vcpus: u32,
    pub memory_mb: u64,
    pub disk_gb: u64,
    pub transfer_gb: u64,
}

/// A virtual machine as seen through any vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInstance {
    /// Vendor-native identifier, stringified
    pub id: String,
    pub label: String,
    pub status: InstanceStatus,
    /// Public addresses first
    pub ipv4: Vec<String>,
    pub ipv6: Option<String>,
    pub region: String,
    pub specs: InstanceSpecs,
    pub created: String,
    pub image: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Pricing plan / instance size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPlan {
    pub id: String,
    pub label: String,
    pub vcpus: u32,
    pub memory_mb: u64,
    pub disk_gb: u64,
    pub transfer_gb: u64,
    pub price_monthly: f64,
    pub price_hourly: f64,
    /// Regions the plan is sold in. Empty when the vendor does not scope
    /// plans to regions.
    #[serde(default)]
    pub regions: Vec<String>,
    pub class: Option<String>,
}

/// Bootable OS image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderImage {
    pub id: String,
    pub label: String,
    pub distribution: Option<String>,
    pub deprecated: bool,
    pub min_disk_gb: Option<u64>,
    pub public: bool,
}

/// Datacenter region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRegion {
    pub id: String,
    pub label: String,
    pub country: Option<String>,
    pub available: bool,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Pre-configured application selectable at creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceApp {
    /// Slug (DigitalOcean) or StackScript id (Linode)
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub provider_type: ProviderType,
}

/// Vendor-specific creation options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "vendor", rename_all = "lowercase")]
pub enum VendorExtras {
    #[default]
    None,
    Linode {
        /// StackScript to run on first boot
        stackscript_id: Option<u64>,
        /// User-defined fields for the StackScript
        #[serde(default)]
        stackscript_data: HashMap<String, String>,
    },
    DigitalOcean {
        /// 1-Click app slug, used in place of `image`
        marketplace_app: Option<String>,
        /// Raw cloud-init user data
        user_data: Option<String>,
        #[serde(default)]
        backups: bool,
        #[serde(default)]
        monitoring: bool,
    },
}

impl VendorExtras {
    /// Vendor these extras belong to, `None` for the vendor-neutral variant
    pub fn provider_type(&self) -> Option<ProviderType> {
        match self {
            VendorExtras::None => None,
            VendorExtras::Linode { .. } => Some(ProviderType::Linode),
            VendorExtras::DigitalOcean { .. } => Some(ProviderType::DigitalOcean),
        }
    }
}

/// Parameters for `create_instance`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateInstanceParams {
    pub label: String,
    /// Plan id as returned by `get_plans`
    pub plan: String,
    pub region: String,
    pub image: String,
    pub root_password: Option<String>,
    /// Linode takes raw public keys (`ssh-ed25519 AAAA...`). DigitalOcean
    /// takes IDs or fingerprints of keys already on the account and
    /// rejects raw keys with `VALIDATION_ERROR` on `ssh_keys`.
    #[serde(default)]
    pub ssh_keys: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub extras: VendorExtras,
}

impl CreateInstanceParams {
    pub fn new(
        label: impl Into<String>,
        plan: impl Into<String>,
        region: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            plan: plan.into(),
            region: region.into(),
            image: image.into(),
            ..Default::default()
        }
    }

    pub fn with_root_password(mut self, password: impl Into<String>) -> Self {
        self.root_password = Some(password.into());
        self
    }

    pub fn with_ssh_key(mut self, key: impl Into<String>) -> Self {
        self.ssh_keys.push(key.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_extras(mut self, extras: VendorExtras) -> Self {
        self.extras = extras;
        self
    }

    /// Reject extras meant for another vendor
    pub fn check_extras(&self, provider: ProviderType) -> Result<(), ProviderError> {
        match self.extras.provider_type() {
            Some(owner) if owner != provider => Err(ProviderError::validation(
                provider,
                "extras",
                format!(
                    "{} options cannot be used with {}",
                    owner.display_name(),
                    provider.display_name()
                ),
            )),
            _ => Ok(()),
        }
    }
}
