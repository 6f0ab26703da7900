//! vpsdeck Cloud Provider Abstraction
//!
//! This crate provides one contract for provisioning and controlling
//! virtual machines across cloud vendors, plus the pieces every vendor
//! adapter shares.
//!
//! # Supported Providers
//!
//! - **Linode**: `vpsdeck-cloud-linode`
//! - **DigitalOcean**: `vpsdeck-cloud-digitalocean`
//!
//! Vultr and Hetzner are reserved tags without an adapter.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  vpsdeck CLI                     │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                vpsdeck-cloud                     │
//! │  ┌──────────────┐  ┌─────────────────────────┐  │
//! │  │  ProviderHub │──│ ProviderDirectory       │  │
//! │  └──────┬───────┘  └─────────────────────────┘  │
//! │  ┌──────▼───────────────────────────────────┐   │
//! │  │  ProviderFactory → trait ProviderService │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ResourceCache │  │  Normalizer  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │    linode     │ │ digitalocean  │
//! │    adapter    │ │    adapter    │
//! └───────────────┘ └───────────────┘
//! ```

pub mod action;
pub mod cache;
pub mod client;
pub mod directory;
pub mod error;
pub mod factory;
pub mod hub;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod normalize;
pub mod provider;
pub mod types;

// Re-exports
pub use action::InstanceAction;
pub use cache::{
    CacheSettings, CacheStats, CacheValue, CachedResource, Clock, ManualClock, ResourceCache,
    ResourceKind, SystemClock,
};
pub use client::{
    ClientOptions, DIGITALOCEAN_API_BASE, HttpMethod, HttpVendorClient, LINODE_API_BASE,
    RetryConfig, VendorClient, VendorError,
};
pub use directory::{MemoryDirectory, ProviderDirectory, ProviderRecord};
pub use error::{ErrorCode, ProviderError, Result};
pub use factory::{ProviderConstructor, ProviderFactory, ProviderFactoryBuilder};
pub use hub::ProviderHub;
pub use normalize::{
    normalize_digitalocean_error, normalize_error, normalize_linode_error, user_friendly_message,
};
pub use provider::{ProviderContext, ProviderService};
pub use types::{
    CreateInstanceParams, InstanceSpecs, InstanceStatus, MarketplaceApp, ProviderImage,
    ProviderInstance, ProviderPlan, ProviderRegion, ProviderType, VendorExtras,
};
