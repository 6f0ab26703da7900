//! DigitalOcean API v2 client
//!
//! Responses wrap their payload in a key named after the resource
//! (`{"droplet": {...}}`, `{"sizes": [...]}`); this module unwraps those
//! envelopes into typed structs.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vpsdeck_cloud::{HttpMethod, ProviderContext, ProviderError, Result};

const PER_PAGE: u32 = 200;

/// DigitalOcean API wrapper
#[derive(Debug, Clone)]
pub struct DigitalOceanApi {
    ctx: ProviderContext,
}

impl DigitalOceanApi {
    pub fn new(ctx: ProviderContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &ProviderContext {
        &self.ctx
    }

    /// Pull `key` out of a response envelope
    fn unwrap_envelope<T: DeserializeOwned>(&self, mut value: Value, key: &str) -> Result<T> {
        let inner = value
            .get_mut(key)
            .map(Value::take)
            .ok_or_else(|| {
                ProviderError::api(
                    self.ctx.provider_type(),
                    format!("Unexpected response: missing '{}'", key),
                )
            })?;
        self.ctx.decode(inner, key)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<T> {
        let value = self.ctx.call(HttpMethod::Get, path, None).await?;
        self.unwrap_envelope(value, key)
    }

    /// Collect a paginated collection by following `links.pages.next`.
    /// The first request goes to `path` unchanged.
    async fn list<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut request_path = path.to_string();
        let mut current = 1;
        loop {
            let value = self.ctx.call(HttpMethod::Get, &request_path, None).await?;
            let next = next_page(&value);
            let page: Vec<T> = self.unwrap_envelope(value, key)?;
            let fetched = page.len();
            items.extend(page);

            match next {
                Some(next) if next > current && fetched > 0 => {
                    current = next;
                    let separator = if path.contains('?') { '&' } else { '?' };
                    request_path = format!("{}{}page={}", path, separator, next);
                }
                _ => return Ok(items),
            }
        }
    }

    pub async fn list_droplets(&self) -> Result<Vec<Droplet>> {
        self.list(&format!("/droplets?per_page={}", PER_PAGE), "droplets")
            .await
    }

    pub async fn get_droplet(&self, id: &str) -> Result<Droplet> {
        let value = self
            .ctx
            .call_resource(
                HttpMethod::Get,
                &format!("/droplets/{}", id),
                None,
                "Instance",
                id,
            )
            .await?;
        self.unwrap_envelope(value, "droplet")
    }

    pub async fn create_droplet(&self, request: &CreateDropletRequest) -> Result<Droplet> {
        let body = serde_json::to_value(request)
            .map_err(|e| ProviderError::api(self.ctx.provider_type(), e.to_string()))?;
        let value = self
            .ctx
            .call(HttpMethod::Post, "/droplets", Some(&body))
            .await?;
        self.unwrap_envelope(value, "droplet")
    }

    /// `POST /droplets/{id}/actions` with `{"type": action}` plus any
    /// extra parameters
    pub async fn droplet_action(&self, id: &str, action: &str, params: Option<&Value>) -> Result<()> {
        let mut body = Map::new();
        if let Some(Value::Object(extra)) = params {
            body.extend(extra.clone());
        }
        body.insert("type".to_string(), Value::String(action.to_string()));

        self.ctx
            .call_resource(
                HttpMethod::Post,
                &format!("/droplets/{}/actions", id),
                Some(&Value::Object(body)),
                "Instance",
                id,
            )
            .await?;
        Ok(())
    }

    pub async fn delete_droplet(&self, id: &str) -> Result<()> {
        self.ctx
            .call_resource(
                HttpMethod::Delete,
                &format!("/droplets/{}", id),
                None,
                "Instance",
                id,
            )
            .await?;
        Ok(())
    }

    pub async fn list_sizes(&self) -> Result<Vec<Size>> {
        self.list(&format!("/sizes?per_page={}", PER_PAGE), "sizes").await
    }

    pub async fn list_images(&self) -> Result<Vec<Image>> {
        self.list(
            &format!("/images?type=distribution&per_page={}", PER_PAGE),
            "images",
        )
        .await
    }

    pub async fn list_regions(&self) -> Result<Vec<Region>> {
        self.list("/regions", "regions").await
    }

    pub async fn list_one_clicks(&self) -> Result<Vec<OneClick>> {
        self.list("/1-clicks?type=droplet", "1_clicks").await
    }

    pub async fn account(&self) -> Result<Account> {
        self.get("/account", "account").await
    }
}

/// Page number of `links.pages.next`, when the response has one
fn next_page(value: &Value) -> Option<u32> {
    let next = value.pointer("/links/pages/next")?.as_str()?;
    let (_, query) = next.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == "page")
        .and_then(|(_, page)| page.parse().ok())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Droplet {
    pub id: u64,
    pub name: String,
    pub status: String,
    /// MB
    pub memory: u64,
    pub vcpus: u32,
    /// GB
    pub disk: u64,
    pub created_at: String,
    pub image: Option<DropletImage>,
    pub size: Option<DropletSize>,
    #[serde(default)]
    pub networks: Networks,
    pub region: Option<DropletRegion>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropletImage {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub distribution: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropletSize {
    pub slug: String,
    /// TB
    #[serde(default)]
    pub transfer: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropletRegion {
    pub slug: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Networks {
    #[serde(default)]
    pub v4: Vec<NetworkAddress>,
    #[serde(default)]
    pub v6: Vec<NetworkAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkAddress {
    pub ip_address: String,
    /// `public` or `private`
    #[serde(rename = "type")]
    pub kind: String,
}

impl NetworkAddress {
    pub fn is_public(&self) -> bool {
        self.kind == "public"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Size {
    pub slug: String,
    /// MB
    pub memory: u64,
    pub vcpus: u32,
    /// GB
    pub disk: u64,
    /// TB
    pub transfer: f64,
    pub price_monthly: f64,
    pub price_hourly: f64,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default = "default_true")]
    pub available: bool,
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: u64,
    pub slug: Option<String>,
    pub name: String,
    pub distribution: Option<String>,
    #[serde(default)]
    pub public: bool,
    pub min_disk_size: Option<u64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneClick {
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub email: Option<String>,
    pub status: Option<String>,
}

/// Body of `POST /droplets`
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateDropletRequest {
    pub name: String,
    pub region: String,
    pub size: String,
    pub image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub backups: bool,
    pub monitoring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use vpsdeck_cloud::mock::MockVendorClient;
    use vpsdeck_cloud::{ErrorCode, ProviderType, ResourceCache};

    fn api() -> (DigitalOceanApi, Arc<MockVendorClient>) {
        let client = Arc::new(MockVendorClient::new());
        let ctx = ProviderContext::new(
            ProviderType::DigitalOcean,
            "dop_v1_token",
            None,
            Arc::new(ResourceCache::new()),
            client.clone(),
        );
        (DigitalOceanApi::new(ctx), client)
    }

    #[tokio::test]
    async fn test_action_body_merges_params() {
        let (api, client) = api();
        client.ok(HttpMethod::Post, "/droplets/7/actions", json!({"action": {"id": 1}}));

        api.droplet_action("7", "power_on", Some(&json!({"type": "ignored", "extra": 1})))
            .await
            .unwrap();

        let body = client.last_call().unwrap().body.unwrap();
        assert_eq!(body["type"], "power_on");
        assert_eq!(body["extra"], 1);
    }

    #[tokio::test]
    async fn test_missing_envelope_key() {
        let (api, client) = api();
        client.ok(HttpMethod::Get, "/regions", json!({"unexpected": []}));

        let err = api.list_regions().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ApiError);
        assert!(err.message.contains("regions"));
    }

    #[tokio::test]
    async fn test_sizes_follow_next_links() {
        let (api, client) = api();
        let size = |slug: &str| {
            json!({
                "slug": slug, "memory": 1024, "vcpus": 1, "disk": 25, "transfer": 1.0,
                "price_monthly": 6.0, "price_hourly": 0.00893, "regions": ["nyc3"],
                "available": true, "description": "Basic"
            })
        };
        client.ok(
            HttpMethod::Get,
            "/sizes?per_page=200",
            json!({
                "sizes": [size("s-1vcpu-1gb")],
                "links": {"pages": {
                    "next": "https://api.digitalocean.com/v2/sizes?page=2&per_page=200",
                    "last": "https://api.digitalocean.com/v2/sizes?page=2&per_page=200"
                }},
                "meta": {"total": 2}
            }),
        );
        client.ok(
            HttpMethod::Get,
            "/sizes?per_page=200&page=2",
            json!({
                "sizes": [size("s-2vcpu-2gb")],
                "links": {"pages": {
                    "prev": "https://api.digitalocean.com/v2/sizes?page=1&per_page=200"
                }},
                "meta": {"total": 2}
            }),
        );

        let sizes = api.list_sizes().await.unwrap();
        let slugs: Vec<_> = sizes.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(slugs, vec!["s-1vcpu-1gb", "s-2vcpu-2gb"]);
        assert_eq!(client.call_count(), 2);
    }

    #[test]
    fn test_next_page_ignores_per_page() {
        let value = json!({"links": {"pages": {"next": "https://api.digitalocean.com/v2/droplets?per_page=200&page=3"}}});
        assert_eq!(next_page(&value), Some(3));
        assert_eq!(next_page(&json!({"links": {}})), None);
    }
}
