//! DigitalOcean provider for vpsdeck
//!
//! This crate implements the ProviderService trait for DigitalOcean
//! droplets over the API v2.
//!
//! # Features
//!
//! - Droplet management (create, get, list, power actions, delete)
//! - Size, image and region catalogs (cached)
//! - 1-Click marketplace apps
//! - Root password via cloud-init user data
//!
//! # Example
//!
//! ```ignore
//! use vpsdeck_cloud::{ProviderContext, ProviderService, ProviderType};
//! use vpsdeck_cloud_digitalocean::DigitalOceanProvider;
//!
//! let ctx = ProviderContext::new(ProviderType::DigitalOcean, token, Some("do-1".into()), cache, client);
//! let provider = DigitalOceanProvider::new(ctx);
//!
//! for droplet in provider.list_instances().await? {
//!     println!("{} {}", droplet.label, droplet.status);
//! }
//! ```

pub mod api;
pub mod cloud_init;
pub mod provider;

pub use api::{CreateDropletRequest, DigitalOceanApi, Droplet};
pub use provider::{DigitalOceanProvider, map_status};
