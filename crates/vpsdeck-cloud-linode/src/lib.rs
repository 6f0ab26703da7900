//! Linode provider for vpsdeck
//!
//! This crate implements the ProviderService trait for Linode,
//! talking to the Linode API v4 through a shared vendor client.
//!
//! # Features
//!
//! - Instance management (create, get, list, boot/shutdown/reboot, delete)
//! - Plan, image and region catalogs (cached)
//! - Marketplace apps (official public StackScripts)
//!
//! `power_off` is served as a graceful shutdown; `power_cycle` is not
//! available on Linode and fails with `INVALID_ACTION`.
//!
//! # Example
//!
//! ```ignore
//! use vpsdeck_cloud::{ProviderContext, ProviderService, ProviderType};
//! use vpsdeck_cloud_linode::LinodeProvider;
//!
//! let ctx = ProviderContext::new(ProviderType::Linode, token, Some("lin-1".into()), cache, client);
//! let provider = LinodeProvider::new(ctx);
//!
//! let plans = provider.get_plans().await?;
//! ```

pub mod api;
pub mod provider;

pub use api::{CreateLinodeRequest, LinodeApi, LinodeInstance};
pub use provider::{LinodeProvider, map_status};
