//! In-process resource cache
//!
//! Caches slow-changing vendor catalogs (plans, images, regions, marketplace
//! apps) per `(provider_id, kind)`. An entry is readable only while
//! `now < stored_at + ttl` and its kind is enabled; expired or disabled
//! entries stay in the map until overwritten (lazy eviction).
//!
//! The cache is constructed explicitly and shared through `Arc`, so tests
//! can create isolated instances with a [`ManualClock`].

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::Result;
use crate::types::{MarketplaceApp, ProviderImage, ProviderPlan, ProviderRegion};

const HOUR: Duration = Duration::from_secs(60 * 60);

/// Cached resource class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Plans,
    Images,
    Regions,
    Marketplace,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Plans,
        ResourceKind::Images,
        ResourceKind::Regions,
        ResourceKind::Marketplace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Plans => "plans",
            ResourceKind::Images => "images",
            ResourceKind::Regions => "regions",
            ResourceKind::Marketplace => "marketplace",
        }
    }

    pub fn default_ttl(&self) -> Duration {
        match self {
            ResourceKind::Marketplace => 6 * HOUR,
            _ => HOUR,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown resource kind: {}", s))
    }
}

/// Per-kind cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub enabled: bool,
}

impl CacheSettings {
    pub fn defaults_for(kind: ResourceKind) -> Self {
        Self {
            ttl: kind.default_ttl(),
            enabled: true,
        }
    }
}

/// Time source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        *self.now.lock() += delta;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// A cached catalog snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum CacheValue {
    Plans(Vec<ProviderPlan>),
    Images(Vec<ProviderImage>),
    Regions(Vec<ProviderRegion>),
    Marketplace(Vec<MarketplaceApp>),
}

impl CacheValue {
    pub fn kind(&self) -> ResourceKind {
        match self {
            CacheValue::Plans(_) => ResourceKind::Plans,
            CacheValue::Images(_) => ResourceKind::Images,
            CacheValue::Regions(_) => ResourceKind::Regions,
            CacheValue::Marketplace(_) => ResourceKind::Marketplace,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CacheValue::Plans(v) => v.len(),
            CacheValue::Images(v) => v.len(),
            CacheValue::Regions(v) => v.len(),
            CacheValue::Marketplace(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Item type stored under a fixed [`ResourceKind`]
pub trait CachedResource: Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn wrap(items: Vec<Self>) -> CacheValue;

    fn extract(value: &CacheValue) -> Option<Vec<Self>>;
}

macro_rules! cached_resource {
    ($ty:ty, $variant:ident) => {
        impl CachedResource for $ty {
            const KIND: ResourceKind = ResourceKind::$variant;

            fn wrap(items: Vec<Self>) -> CacheValue {
                CacheValue::$variant(items)
            }

            fn extract(value: &CacheValue) -> Option<Vec<Self>> {
                match value {
                    CacheValue::$variant(items) => Some(items.clone()),
                    _ => None,
                }
            }
        }
    };
}

cached_resource!(ProviderPlan, Plans);
cached_resource!(ProviderImage, Images);
cached_resource!(ProviderRegion, Regions);
cached_resource!(MarketplaceApp, Marketplace);

type CacheKey = (String, ResourceKind);

/// Stored snapshot. Replaced wholesale, never patched.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<CacheValue>,
    pub stored_at: DateTime<Utc>,
}

/// Introspection data for one kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub count: usize,
    pub provider_ids: Vec<String>,
}

/// Serializes fetches for one key
#[derive(Debug, Default)]
struct FetchSlot {
    lock: tokio::sync::Mutex<()>,
    /// Set when the key is invalidated while a fetch holds the slot
    stale: AtomicBool,
}

/// Drops the slot from the in-flight map once its last user is done
struct SlotRelease<'a> {
    inflight: &'a DashMap<CacheKey, Arc<FetchSlot>>,
    key: CacheKey,
    slot: Arc<FetchSlot>,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        // One reference is the map's, the other ours
        self.inflight.remove_if(&self.key, |_, slot| {
            Arc::ptr_eq(slot, &self.slot) && Arc::strong_count(slot) == 2
        });
    }
}

/// Keyed TTL store shared by every adapter
pub struct ResourceCache {
    entries: DashMap<CacheKey, CacheEntry>,
    settings: RwLock<HashMap<ResourceKind, CacheSettings>>,
    inflight: DashMap<CacheKey, Arc<FetchSlot>>,
    clock: Arc<dyn Clock>,
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.entries.len())
            .field("settings", &*self.settings.read())
            .finish()
    }
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let settings = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, CacheSettings::defaults_for(kind)))
            .collect();
        Self {
            entries: DashMap::new(),
            settings: RwLock::new(settings),
            inflight: DashMap::new(),
            clock,
        }
    }

    fn key(kind: ResourceKind, provider_id: &str) -> CacheKey {
        (provider_id.to_string(), kind)
    }

    pub fn settings(&self, kind: ResourceKind) -> CacheSettings {
        self.settings
            .read()
            .get(&kind)
            .copied()
            .unwrap_or_else(|| CacheSettings::defaults_for(kind))
    }

    /// Change the TTL for a kind. Applies to existing entries immediately.
    pub fn configure(&self, kind: ResourceKind, ttl: Duration) {
        self.settings
            .write()
            .entry(kind)
            .or_insert_with(|| CacheSettings::defaults_for(kind))
            .ttl = ttl;
        tracing::debug!("Cache TTL for {} set to {:?}", kind, ttl);
    }

    /// Enable or disable a kind. A disabled kind always misses.
    pub fn set_enabled(&self, kind: ResourceKind, enabled: bool) {
        self.settings
            .write()
            .entry(kind)
            .or_insert_with(|| CacheSettings::defaults_for(kind))
            .enabled = enabled;
        tracing::debug!("Cache for {} enabled={}", kind, enabled);
    }

    fn is_fresh(&self, entry: &CacheEntry, settings: CacheSettings) -> bool {
        if !settings.enabled {
            return false;
        }
        // A stored_at in the future (clock moved back) counts as fresh.
        self.clock
            .now()
            .signed_duration_since(entry.stored_at)
            .to_std()
            .map(|age| age < settings.ttl)
            .unwrap_or(true)
    }

    /// Stored value, if present, enabled and unexpired
    pub fn get(&self, kind: ResourceKind, provider_id: &str) -> Option<Arc<CacheValue>> {
        let settings = self.settings(kind);
        let entry = self.entries.get(&Self::key(kind, provider_id))?;
        if self.is_fresh(&entry, settings) {
            Some(Arc::clone(&entry.value))
        } else {
            None
        }
    }

    /// Store a new snapshot, replacing any previous one
    pub fn set(&self, kind: ResourceKind, provider_id: &str, value: CacheValue) {
        if value.kind() != kind {
            tracing::warn!(
                "Refusing to cache {} snapshot under {} for provider {}",
                value.kind(),
                kind,
                provider_id
            );
            return;
        }
        let entry = CacheEntry {
            value: Arc::new(value),
            stored_at: self.clock.now(),
        };
        self.entries.insert(Self::key(kind, provider_id), entry);
    }

    pub fn get_typed<T: CachedResource>(&self, provider_id: &str) -> Option<Vec<T>> {
        self.get(T::KIND, provider_id)
            .and_then(|value| T::extract(&value))
    }

    pub fn set_typed<T: CachedResource>(&self, provider_id: &str, items: Vec<T>) {
        self.set(T::KIND, provider_id, T::wrap(items));
    }

    /// Read through the cache, calling `fetch` on a miss.
    ///
    /// At most one fetch per `(provider_id, kind)` runs at a time; callers
    /// that queued behind it re-read the cache before fetching themselves.
    /// Errors are returned as-is and never cached. A result whose key was
    /// invalidated while the fetch ran is returned but not stored.
    pub async fn get_or_fetch<T, F, Fut>(&self, provider_id: &str, fetch: F) -> Result<Vec<T>>
    where
        T: CachedResource,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        if let Some(items) = self.get_typed::<T>(provider_id) {
            tracing::debug!("Cache hit: {} for provider {}", T::KIND, provider_id);
            return Ok(items);
        }

        let key = Self::key(T::KIND, provider_id);
        let release = SlotRelease {
            inflight: &self.inflight,
            slot: self.inflight.entry(key.clone()).or_default().clone(),
            key,
        };
        let _guard = release.slot.lock.lock().await;

        if let Some(items) = self.get_typed::<T>(provider_id) {
            tracing::debug!(
                "Cache filled while waiting: {} for provider {}",
                T::KIND,
                provider_id
            );
            return Ok(items);
        }

        tracing::debug!("Cache miss: {} for provider {}", T::KIND, provider_id);
        let items = fetch().await?;
        if !self.store_unless_stale(&release.key, &release.slot, T::wrap(items.clone())) {
            tracing::debug!(
                "Discarded {} fetched for provider {}: invalidated during fetch",
                T::KIND,
                provider_id
            );
        }
        Ok(items)
    }

    /// The stale check and the insert happen under the entry's shard lock,
    /// which invalidation also takes after marking slots stale.
    fn store_unless_stale(&self, key: &CacheKey, slot: &FetchSlot, value: CacheValue) -> bool {
        let entry = self.entries.entry(key.clone());
        if slot.stale.load(Ordering::SeqCst) {
            return false;
        }
        entry.insert(CacheEntry {
            value: Arc::new(value),
            stored_at: self.clock.now(),
        });
        true
    }

    /// Forget in-flight fetches matching `pred` and mark them stale
    fn abandon_fetches(&self, pred: impl Fn(&CacheKey) -> bool) {
        self.inflight.retain(|key, slot| {
            if pred(key) {
                slot.stale.store(true, Ordering::SeqCst);
                false
            } else {
                true
            }
        });
    }

    /// Drop every kind cached for one provider
    pub fn invalidate_provider(&self, provider_id: &str) {
        self.abandon_fetches(|(id, _)| id == provider_id);
        self.entries.retain(|(id, _), _| id != provider_id);
        tracing::info!("Invalidated cache for provider {}", provider_id);
    }

    /// Drop one kind for one provider
    pub fn invalidate(&self, provider_id: &str, kind: ResourceKind) {
        let key = Self::key(kind, provider_id);
        self.abandon_fetches(|k| *k == key);
        self.entries.remove(&key);
        tracing::debug!("Invalidated {} cache for provider {}", kind, provider_id);
    }

    pub fn clear_all(&self) {
        self.abandon_fetches(|_| true);
        self.entries.clear();
        tracing::info!("Cleared resource cache");
    }

    /// Entries currently held per kind, fresh or not
    pub fn stats(&self) -> BTreeMap<ResourceKind, CacheStats> {
        let mut stats: BTreeMap<ResourceKind, CacheStats> = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, CacheStats::default()))
            .collect();

        for entry in self.entries.iter() {
            let (provider_id, kind) = entry.key();
            let slot = stats.entry(*kind).or_default();
            slot.count += 1;
            slot.provider_ids.push(provider_id.clone());
        }
        for slot in stats.values_mut() {
            slot.provider_ids.sort();
        }
        stats
    }
}
