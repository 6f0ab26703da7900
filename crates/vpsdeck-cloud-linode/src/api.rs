//! Linode API v4 wrapper
//!
//! Thin typed layer over the `/v4` REST endpoints. Every call goes through
//! [`ProviderContext`], so credentials are checked and errors normalized
//! before anything reaches the adapter.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use vpsdeck_cloud::{HttpMethod, ProviderContext, Result};

/// Largest page Linode serves
const PAGE_SIZE: u32 = 500;

/// Public StackScripts published by Linode itself
const MARKETPLACE_FILTER: &str = r#"{"username":"linode","is_public":true}"#;

/// Linode API wrapper
#[derive(Debug, Clone)]
pub struct LinodeApi {
    ctx: ProviderContext,
}

impl LinodeApi {
    pub fn new(ctx: ProviderContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &ProviderContext {
        &self.ctx
    }

    async fn list<T: for<'de> Deserialize<'de>>(&self, path: &str, what: &str) -> Result<Vec<T>> {
        self.list_filtered(path, what, &[]).await
    }

    /// Collect every page of a collection. The first request goes to `path`
    /// unchanged; later pages add `page=N`.
    async fn list_filtered<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        what: &str,
        headers: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut request_path = path.to_string();
        loop {
            let value = self
                .ctx
                .call_with_headers(HttpMethod::Get, &request_path, None, headers)
                .await?;
            let page: Page<T> = self.ctx.decode(value, what)?;
            let fetched = page.data.len();
            items.extend(page.data);

            let current = page.page.max(1);
            if current >= page.pages || fetched == 0 {
                return Ok(items);
            }
            request_path = page_path(path, current + 1);
        }
    }

    /// List all instances
    pub async fn list_linodes(&self) -> Result<Vec<LinodeInstance>> {
        self.list(&format!("/linode/instances?page_size={}", PAGE_SIZE), "instance list")
            .await
    }

    /// Get instance by ID
    pub async fn get_linode(&self, id: &str) -> Result<LinodeInstance> {
        let value = self
            .ctx
            .call_resource(
                HttpMethod::Get,
                &format!("/linode/instances/{}", id),
                None,
                "Instance",
                id,
            )
            .await?;
        self.ctx.decode(value, "instance")
    }

    /// Create an instance
    pub async fn create_linode(&self, request: &CreateLinodeRequest) -> Result<LinodeInstance> {
        let body = serde_json::to_value(request).map_err(|e| {
            vpsdeck_cloud::ProviderError::api(self.ctx.provider_type(), e.to_string())
        })?;
        let value = self
            .ctx
            .call(HttpMethod::Post, "/linode/instances", Some(&body))
            .await?;
        self.ctx.decode(value, "instance")
    }

    /// POST an instance sub-action (`boot`, `shutdown`, `reboot`)
    pub async fn instance_action(&self, id: &str, action: &str, params: Option<&Value>) -> Result<()> {
        self.ctx
            .call_resource(
                HttpMethod::Post,
                &format!("/linode/instances/{}/{}", id, action),
                params,
                "Instance",
                id,
            )
            .await?;
        Ok(())
    }

    /// Delete an instance and its disks
    pub async fn delete_linode(&self, id: &str) -> Result<()> {
        self.ctx
            .call_resource(
                HttpMethod::Delete,
                &format!("/linode/instances/{}", id),
                None,
                "Instance",
                id,
            )
            .await?;
        Ok(())
    }

    pub async fn list_types(&self) -> Result<Vec<LinodeType>> {
        self.list("/linode/types", "type list").await
    }

    pub async fn list_images(&self) -> Result<Vec<LinodeImage>> {
        self.list("/images", "image list").await
    }

    pub async fn list_regions(&self) -> Result<Vec<LinodeRegion>> {
        self.list("/regions", "region list").await
    }

    /// Public StackScripts published by Linode, filtered server-side
    pub async fn list_stackscripts(&self) -> Result<Vec<StackScript>> {
        self.list_filtered(
            &format!("/linode/stackscripts?page_size={}", PAGE_SIZE),
            "stackscript list",
            &[("X-Filter", MARKETPLACE_FILTER)],
        )
        .await
    }

    /// Profile of the token owner
    pub async fn profile(&self) -> Result<Profile> {
        let value = self.ctx.call(HttpMethod::Get, "/profile", None).await?;
        self.ctx.decode(value, "profile")
    }
}

fn page_path(path: &str, page: u32) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}page={}", path, separator, page)
}

/// Paginated envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
}

/// Instance as returned by `/linode/instances`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinodeInstance {
    pub id: u64,
    pub label: String,
    pub status: String,
    #[serde(default)]
    pub ipv4: Vec<String>,
    pub ipv6: Option<String>,
    pub region: String,
    pub specs: LinodeSpecs,
    pub created: String,
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub plan: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinodeSpecs {
    pub vcpus: u32,
    /// MB
    pub memory: u64,
    /// MB
    pub disk: u64,
    /// GB
    pub transfer: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinodeType {
    pub id: String,
    pub label: String,
    pub vcpus: u32,
    /// MB
    pub memory: u64,
    /// MB
    pub disk: u64,
    /// GB
    pub transfer: u64,
    pub price: LinodePrice,
    pub class: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinodePrice {
    pub monthly: f64,
    pub hourly: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinodeImage {
    pub id: String,
    pub label: String,
    pub vendor: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    /// MB
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinodeRegion {
    pub id: String,
    pub label: Option<String>,
    pub country: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackScript {
    pub id: u64,
    pub label: String,
    pub description: Option<String>,
    pub username: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub email: Option<String>,
}

/// Body of `POST /linode/instances`
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateLinodeRequest {
    pub label: String,
    #[serde(rename = "type")]
    pub plan: String,
    pub region: String,
    pub image: String,
    pub root_pass: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authorized_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stackscript_id: Option<u64>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub stackscript_data: HashMap<String, String>,
    pub booted: bool,
}
