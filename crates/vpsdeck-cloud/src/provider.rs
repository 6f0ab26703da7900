//! Cloud provider trait definition

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::action::InstanceAction;
use crate::cache::{CachedResource, ResourceCache};
use crate::client::{HttpMethod, VendorClient};
use crate::error::{ProviderError, Result};
use crate::normalize::normalize_error;
use crate::types::{
    CreateInstanceParams, MarketplaceApp, ProviderImage, ProviderInstance, ProviderPlan,
    ProviderRegion, ProviderType,
};

/// Cloud provider abstraction trait
///
/// Every vendor adapter (Linode, DigitalOcean) implements this trait so
/// callers can manage instances and read catalogs without knowing which
/// vendor sits behind it. All failures are normalized [`ProviderError`]s.
#[async_trait]
pub trait ProviderService: Send + Sync {
    /// Shared adapter state (credential, cache, vendor client)
    fn context(&self) -> &ProviderContext;

    fn provider_type(&self) -> ProviderType {
        self.context().provider_type()
    }

    /// Configured provider record id, if the adapter was built for one
    fn provider_id(&self) -> Option<&str> {
        self.context().provider_id()
    }

    /// Create a new instance
    async fn create_instance(&self, params: &CreateInstanceParams) -> Result<ProviderInstance>;

    /// Fetch one instance by vendor id
    async fn get_instance(&self, id: &str) -> Result<ProviderInstance>;

    /// List every instance visible to the credential
    async fn list_instances(&self) -> Result<Vec<ProviderInstance>>;

    /// Request a power or lifecycle transition. Returns once the vendor
    /// accepted it.
    async fn perform_action(
        &self,
        id: &str,
        action: InstanceAction,
        params: Option<&Value>,
    ) -> Result<()>;

    /// Same as [`ProviderService::perform_action`] with an untyped action
    /// name, as received from an operator
    async fn perform_action_named(
        &self,
        id: &str,
        action: &str,
        params: Option<&Value>,
    ) -> Result<()> {
        self.context().ensure_credential()?;
        let parsed = InstanceAction::parse(action)
            .ok_or_else(|| ProviderError::invalid_action(self.provider_type(), action))?;
        self.perform_action(id, parsed, params).await
    }

    async fn get_plans(&self) -> Result<Vec<ProviderPlan>>;

    async fn get_images(&self) -> Result<Vec<ProviderImage>>;

    async fn get_regions(&self) -> Result<Vec<ProviderRegion>>;

    async fn get_marketplace_apps(&self) -> Result<Vec<MarketplaceApp>>;

    /// Check the credential against the vendor. Never fails; an empty
    /// credential is `false` without a vendor call.
    async fn validate_credentials(&self) -> bool;
}

/// State every adapter is constructed with
#[derive(Clone)]
pub struct ProviderContext {
    provider_type: ProviderType,
    credential: String,
    provider_id: Option<String>,
    cache: Arc<ResourceCache>,
    client: Arc<dyn VendorClient>,
}

impl std::fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderContext")
            .field("provider_type", &self.provider_type)
            .field("credential", &"<redacted>")
            .field("provider_id", &self.provider_id)
            .finish()
    }
}

impl ProviderContext {
    pub fn new(
        provider_type: ProviderType,
        credential: impl Into<String>,
        provider_id: Option<String>,
        cache: Arc<ResourceCache>,
        client: Arc<dyn VendorClient>,
    ) -> Self {
        Self {
            provider_type,
            credential: credential.into(),
            provider_id,
            cache,
            client,
        }
    }

    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    pub fn provider_id(&self) -> Option<&str> {
        self.provider_id.as_deref()
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    pub fn has_credential(&self) -> bool {
        !self.credential.trim().is_empty()
    }

    /// Trimmed credential, or `MISSING_CREDENTIALS`
    pub fn ensure_credential(&self) -> Result<&str> {
        let token = self.credential.trim();
        if token.is_empty() {
            return Err(ProviderError::missing_credentials(self.provider_type));
        }
        Ok(token)
    }

    /// Authenticated vendor call with normalized errors
    pub async fn call(&self, method: HttpMethod, path: &str, body: Option<&Value>) -> Result<Value> {
        self.call_with_headers(method, path, body, &[]).await
    }

    /// [`ProviderContext::call`] with extra request headers
    pub async fn call_with_headers(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> Result<Value> {
        let token = self.ensure_credential()?;
        tracing::debug!("{} {} {}", self.provider_type, method.as_str(), path);
        self.client
            .call_with_headers(method, path, body, token, headers)
            .await
            .map_err(|e| normalize_error(self.provider_type, &e))
    }

    /// Like [`ProviderContext::call`], but a 404 becomes `API_ERROR`
    /// "`<resource>` not found: `<id>`"
    pub async fn call_resource(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        resource: &str,
        id: &str,
    ) -> Result<Value> {
        let token = self.ensure_credential()?;
        tracing::debug!("{} {} {}", self.provider_type, method.as_str(), path);
        match self.client.call(method, path, body, token).await {
            Ok(value) => Ok(value),
            Err(e) if e.http_status() == Some(404) => Err(ProviderError::api(
                self.provider_type,
                format!("{} not found: {}", resource, id),
            )
            .with_original(e.to_json())),
            Err(e) => Err(normalize_error(self.provider_type, &e)),
        }
    }

    /// Deserialize a vendor payload; a shape mismatch is `API_ERROR`
    pub fn decode<T: DeserializeOwned>(&self, value: Value, what: &str) -> Result<T> {
        serde_json::from_value(value).map_err(|e| {
            ProviderError::api(
                self.provider_type,
                format!("Unexpected {} response: {}", what, e),
            )
        })
    }

    /// Cache-first read for a catalog kind. Without a provider id the cache
    /// is bypassed.
    pub async fn cached<T, F, Fut>(&self, fetch: F) -> Result<Vec<T>>
    where
        T: CachedResource,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<T>>> + Send,
    {
        self.ensure_credential()?;
        match &self.provider_id {
            Some(provider_id) => self.cache.get_or_fetch(provider_id, fetch).await,
            None => fetch().await,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::ResourceKind;
    use crate::client::VendorError;
    use crate::error::ErrorCode;
    use crate::mock::MockVendorClient;
    use serde_json::json;

    /// Minimal adapter reading plans from `GET /plans`
    pub(crate) struct StubService {
        ctx: ProviderContext,
    }

    impl StubService {
        pub(crate) fn boxed(ctx: ProviderContext) -> Arc<dyn ProviderService> {
            Arc::new(Self { ctx })
        }

        async fn fetch_plans(&self) -> Result<Vec<ProviderPlan>> {
            let value = self.ctx.call(HttpMethod::Get, "/plans", None).await?;
            self.ctx.decode(value, "plan list")
        }
    }

    #[async_trait]
    impl ProviderService for StubService {
        fn context(&self) -> &ProviderContext {
            &self.ctx
        }

        async fn create_instance(&self, _params: &CreateInstanceParams) -> Result<ProviderInstance> {
            Err(ProviderError::api(self.provider_type(), "create is not stubbed"))
        }

        async fn get_instance(&self, id: &str) -> Result<ProviderInstance> {
            let value = self
                .ctx
                .call_resource(HttpMethod::Get, &format!("/instances/{}", id), None, "Instance", id)
                .await?;
            self.ctx.decode(value, "instance")
        }

        async fn list_instances(&self) -> Result<Vec<ProviderInstance>> {
            Ok(Vec::new())
        }

        async fn perform_action(
            &self,
            id: &str,
            action: InstanceAction,
            _params: Option<&Value>,
        ) -> Result<()> {
            let body = json!({"type": action.as_str()});
            self.ctx
                .call(HttpMethod::Post, &format!("/instances/{}/actions", id), Some(&body))
                .await?;
            Ok(())
        }

        async fn get_plans(&self) -> Result<Vec<ProviderPlan>> {
            self.ctx.cached(|| self.fetch_plans()).await
        }

        async fn get_images(&self) -> Result<Vec<ProviderImage>> {
            Ok(Vec::new())
        }

        async fn get_regions(&self) -> Result<Vec<ProviderRegion>> {
            Ok(Vec::new())
        }

        async fn get_marketplace_apps(&self) -> Result<Vec<MarketplaceApp>> {
            Ok(Vec::new())
        }

        async fn validate_credentials(&self) -> bool {
            self.ctx.has_credential()
        }
    }

    pub(crate) fn plans_json() -> Value {
        json!([{
            "id": "small", "label": "Small", "vcpus": 1, "memory_mb": 1024, "disk_gb": 25,
            "transfer_gb": 1000, "price_monthly": 5.0, "price_hourly": 0.0075,
            "regions": [], "class": null
        }])
    }

    fn stub(token: &str, provider_id: Option<&str>) -> (Arc<dyn ProviderService>, Arc<MockVendorClient>) {
        let client = Arc::new(MockVendorClient::new());
        let ctx = ProviderContext::new(
            ProviderType::Linode,
            token,
            provider_id.map(str::to_string),
            Arc::new(ResourceCache::new()),
            client.clone(),
        );
        (StubService::boxed(ctx), client)
    }

    #[test]
    fn test_context_debug_hides_credential() {
        let (service, _) = stub("secret-token", None);
        let debug = format!("{:?}", service.context());
        assert!(!debug.contains("secret-token"));
    }

    #[tokio::test]
    async fn test_credential_is_trimmed() {
        let (service, client) = stub("  tok \n", Some("p1"));
        client.ok(HttpMethod::Get, "/plans", plans_json());

        service.get_plans().await.unwrap();
        assert_eq!(client.last_call().unwrap().token, "tok");
    }

    #[tokio::test]
    async fn test_cache_bypassed_without_provider_id() {
        let (service, client) = stub("tok", None);
        client.ok(HttpMethod::Get, "/plans", plans_json());

        service.get_plans().await.unwrap();
        service.get_plans().await.unwrap();
        assert_eq!(client.calls_to("/plans"), 2);
        assert_eq!(service.context().cache().stats()[&ResourceKind::Plans].count, 0);
    }

    #[tokio::test]
    async fn test_cache_used_with_provider_id() {
        let (service, client) = stub("tok", Some("p1"));
        client.ok(HttpMethod::Get, "/plans", plans_json());

        let plans = service.get_plans().await.unwrap();
        assert_eq!(plans[0].id, "small");
        service.get_plans().await.unwrap();
        assert_eq!(client.calls_to("/plans"), 1);
    }

    #[tokio::test]
    async fn test_missing_credentials_short_circuit() {
        let (service, client) = stub("", Some("p1"));

        let err = service.get_plans().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingCredentials);
        let err = service.perform_action_named("1", "reboot", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingCredentials);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_named_action_parsing() {
        let (service, client) = stub("tok", None);
        client.ok(HttpMethod::Post, "/instances/9/actions", json!({}));

        service.perform_action_named("9", " Power_On ", None).await.unwrap();
        assert_eq!(client.last_call().unwrap().body, Some(json!({"type": "boot"})));

        let err = service.perform_action_named("9", "hibernate", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAction);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_resource_not_found_and_decode_errors() {
        let (service, client) = stub("tok", None);
        client.fail(HttpMethod::Get, "/instances/404", VendorError::status(404, None));
        client.ok(HttpMethod::Get, "/instances/bad", json!({"unexpected": true}));

        let err = service.get_instance("404").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ApiError);
        assert_eq!(err.message, "Instance not found: 404");
        assert!(err.original_error.is_some());

        let err = service.get_instance("bad").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ApiError);
        assert!(err.message.starts_with("Unexpected instance response"));
    }
}
