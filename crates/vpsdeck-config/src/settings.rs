//! vpsdeck settings file
//!
//! ```yaml
//! providers:
//!   - id: do-main
//!     type: digitalocean
//!     token_env: DIGITALOCEAN_TOKEN
//!   - id: lin-lab
//!     type: linode
//!     token: "..."
//!     active: false
//! cache:
//!   marketplace: { ttl_secs: 86400 }
//!   images: { enabled: false }
//! http:
//!   timeout_secs: 20
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;
use vpsdeck_cloud::{ClientOptions, ProviderRecord, ProviderType, ResourceCache, ResourceKind};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,

    #[serde(default)]
    pub cache: BTreeMap<ResourceKind, CacheKindSettings>,

    #[serde(default)]
    pub http: HttpSettings,
}

/// One provider account
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderEntry {
    pub id: String,

    #[serde(rename = "type")]
    pub provider_type: ProviderType,

    /// Inline API token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable holding the API token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn default_active() -> bool {
    true
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("id", &self.id)
            .field("provider_type", &self.provider_type)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("token_env", &self.token_env)
            .field("active", &self.active)
            .field("label", &self.label)
            .finish()
    }
}

impl ProviderEntry {
    /// Token from the inline value or the named environment variable.
    /// Empty when neither is set; adapters then fail with
    /// `MISSING_CREDENTIALS`.
    pub fn resolve_token(&self) -> String {
        if let Some(token) = self.token.as_ref().filter(|t| !t.trim().is_empty()) {
            return token.clone();
        }
        if let Some(var) = &self.token_env {
            match std::env::var(var) {
                Ok(token) => return token,
                Err(_) => tracing::warn!(
                    "Provider {}: environment variable {} is not set",
                    self.id,
                    var
                ),
            }
        }
        String::new()
    }

    pub fn to_record(&self) -> ProviderRecord {
        ProviderRecord {
            id: self.id.clone(),
            provider_type: self.provider_type,
            credential: self.resolve_token(),
            active: self.active,
            label: self.label.clone(),
        }
    }
}

/// Per-kind cache overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheKindSettings {
    pub ttl_secs: Option<u64>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 5,
            max_attempts: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl Settings {
    pub fn from_yaml_str(content: &str, path: &Path) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Loading settings from {}", path.display());
        Self::from_yaml_str(&content, path)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.providers {
            if entry.id.trim().is_empty() {
                return Err(ConfigError::InvalidProvider {
                    id: entry.id.clone(),
                    message: "id must not be empty".to_string(),
                });
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(ConfigError::DuplicateProvider(entry.id.clone()));
            }
            if entry.token.is_some() && entry.token_env.is_some() {
                return Err(ConfigError::InvalidProvider {
                    id: entry.id.clone(),
                    message: "set either token or token_env, not both".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn provider(&self, id: &str) -> Option<&ProviderEntry> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// Push cache overrides into a cache instance
    pub fn apply_cache(&self, cache: &ResourceCache) {
        for (kind, overrides) in &self.cache {
            if let Some(ttl) = overrides.ttl_secs {
                cache.configure(*kind, Duration::from_secs(ttl));
            }
            if let Some(enabled) = overrides.enabled {
                cache.set_enabled(*kind, enabled);
            }
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions {
            timeout: Duration::from_secs(self.http.timeout_secs),
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            ..ClientOptions::default()
        };
        options.retry.max_attempts = self.http.max_attempts.max(1);
        options.retry.initial_delay = Duration::from_millis(self.http.initial_delay_ms);
        options.retry.max_delay = Duration::from_millis(self.http.max_delay_ms);
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
providers:
  - id: do-main
    type: digitalocean
    token_env: VPSDECK_TEST_DO_TOKEN
    label: Production
  - id: lin-lab
    type: linode
    token: lin-token
    active: false
cache:
  marketplace:
    ttl_secs: 86400
  images:
    enabled: false
http:
  timeout_secs: 20
  max_attempts: 5
"#;

    fn parse(content: &str) -> Result<Settings> {
        Settings::from_yaml_str(content, Path::new("vpsdeck.yaml"))
    }

    #[test]
    fn test_parse_sample() {
        let settings = parse(SAMPLE).unwrap();
        assert_eq!(settings.providers.len(), 2);
        assert_eq!(settings.providers[0].provider_type, ProviderType::DigitalOcean);
        assert!(settings.providers[0].active);
        assert!(!settings.provider("lin-lab").unwrap().active);
        assert_eq!(settings.http.timeout_secs, 20);
        assert_eq!(settings.http.connect_timeout_secs, 5);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = parse(
            "providers:\n  - {id: a, type: linode}\n  - {id: a, type: digitalocean}\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateProvider(id) if id == "a"));
    }

    #[test]
    fn test_unknown_vendor_is_parse_error() {
        let err = parse("providers:\n  - {id: a, type: aws}\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_token_and_token_env_conflict() {
        let err = parse("providers:\n  - {id: a, type: linode, token: x, token_env: Y}\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProvider { .. }));
    }

    #[test]
    fn test_token_resolution() {
        let settings = parse(SAMPLE).unwrap();
        let entry = settings.provider("do-main").unwrap();

        temp_env::with_var("VPSDECK_TEST_DO_TOKEN", Some("dop_v1_abc"), || {
            assert_eq!(entry.resolve_token(), "dop_v1_abc");
        });
        temp_env::with_var_unset("VPSDECK_TEST_DO_TOKEN", || {
            assert_eq!(entry.to_record().credential, "");
        });

        let record = settings.provider("lin-lab").unwrap().to_record();
        assert_eq!(record.credential, "lin-token");
        assert!(!format!("{:?}", settings.providers[1]).contains("lin-token"));
    }

    #[test]
    fn test_apply_cache_and_client_options() {
        let settings = parse(SAMPLE).unwrap();
        let cache = ResourceCache::new();
        settings.apply_cache(&cache);

        assert_eq!(
            cache.settings(ResourceKind::Marketplace).ttl,
            Duration::from_secs(86400)
        );
        assert!(!cache.settings(ResourceKind::Images).enabled);
        assert!(cache.settings(ResourceKind::Plans).enabled);

        let options = settings.client_options();
        assert_eq!(options.timeout, Duration::from_secs(20));
        assert_eq!(options.retry.max_attempts, 5);
    }
}
