//! Result cache for try-on lookups.
//!
//! Entries are addressed by the garment selection plus the chosen reference
//! photo. Images produced locally are held as blob-backed object URLs issued
//! by a [`BlobRegistry`]; the cache owns those handles and revokes them when
//! an entry is replaced or purged.

use crate::constants::CACHE_KEY_SENTINEL;
use crate::store::{ImageId, SettingsStore};
use crate::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

const BLOB_SCHEME: &str = "blob:";

/// Garment selection plus reference photo
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub upper: Option<u64>,
    pub lower: Option<u64>,
    pub reference_photo: Option<ImageId>,
}

impl CacheKey {
    #[must_use]
    pub fn new(upper: Option<u64>, lower: Option<u64>, reference_photo: Option<ImageId>) -> Self {
        Self {
            upper,
            lower,
            reference_photo,
        }
    }

    /// Key for the current selection, using the reference photo chosen in
    /// the user's settings
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the settings cannot be read
    pub fn from_selection(upper: Option<u64>, lower: Option<u64>, settings: &dyn SettingsStore) -> Result<Self> {
        Ok(Self::new(upper, lower, settings.selected_reference_photo_id()?))
    }

    /// Canonical string form, e.g. `5-none-7`. Absent ids become the
    /// sentinel; 0 is a real id.
    #[must_use]
    pub fn normalized(&self) -> String {
        fn part(id: Option<u64>) -> String {
            id.map_or_else(|| CACHE_KEY_SENTINEL.to_string(), |v| v.to_string())
        }
        format!("{}-{}-{}", part(self.upper), part(self.lower), part(self.reference_photo))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized())
    }
}

/// Handle to an image, either remote or blob-backed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    /// A URL that the cache does not own, e.g. a remote result
    #[must_use]
    pub fn external(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_blob(&self) -> bool {
        self.0.starts_with(BLOB_SCHEME)
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
struct Blobs {
    next: u64,
    live: HashMap<String, Arc<[u8]>>,
}

/// Issues and revokes blob-backed object URLs. Clones share one registry.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    inner: Arc<Mutex<Blobs>>,
}

impl BlobRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> std::sync::MutexGuard<'_, Blobs> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register bytes and return a URL for them
    pub fn create(&self, bytes: impl Into<Arc<[u8]>>) -> ObjectUrl {
        let mut blobs = self.blobs();
        blobs.next += 1;
        let url = format!("{BLOB_SCHEME}pose-capture/{}", blobs.next);
        blobs.live.insert(url.clone(), bytes.into());
        ObjectUrl(url)
    }

    /// Release a URL. Non-blob and already revoked URLs are ignored.
    pub fn revoke(&self, url: &ObjectUrl) {
        if !url.is_blob() {
            return;
        }
        if self.blobs().live.remove(url.as_str()).is_some() {
            debug!("Revoked {url}");
        }
    }

    #[must_use]
    pub fn resolve(&self, url: &ObjectUrl) -> Option<Arc<[u8]>> {
        self.blobs().live.get(url.as_str()).cloned()
    }

    #[must_use]
    pub fn is_live(&self, url: &ObjectUrl) -> bool {
        self.blobs().live.contains_key(url.as_str())
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.blobs().live.len()
    }
}

/// Size recommendation for one garment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitData {
    pub size_label: String,
    /// Measurement name to centimetres
    pub measurements: BTreeMap<String, f64>,
}

/// A computed try-on result
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub tryon_image: ObjectUrl,
    pub size_image: Option<ObjectUrl>,
    pub upper_fit: Option<FitData>,
    pub lower_fit: Option<FitData>,
}

impl CacheEntry {
    #[must_use]
    pub fn new(tryon_image: ObjectUrl) -> Self {
        Self {
            tryon_image,
            size_image: None,
            upper_fit: None,
            lower_fit: None,
        }
    }

    fn urls(&self) -> impl Iterator<Item = &ObjectUrl> {
        std::iter::once(&self.tryon_image).chain(self.size_image.as_ref())
    }
}

/// Try-on results for the current product session
#[derive(Debug)]
pub struct ResultCache {
    registry: BlobRegistry,
    entries: HashMap<String, CacheEntry>,
    product: Option<u64>,
}

impl ResultCache {
    #[must_use]
    pub fn new(registry: BlobRegistry) -> Self {
        Self {
            registry,
            entries: HashMap::new(),
            product: None,
        }
    }

    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(&key.normalized())
    }

    /// Store an entry. Handles of a replaced entry are revoked unless the new
    /// entry still uses them.
    pub fn set(&mut self, key: &CacheKey, entry: CacheEntry) {
        let normalized = key.normalized();
        debug!("Caching try-on result for {normalized}");
        if let Some(old) = self.entries.get(&normalized) {
            for url in old.urls().filter(|url| !entry.urls().any(|kept| kept == *url)) {
                self.registry.revoke(url);
            }
        }
        self.entries.insert(normalized, entry);
    }

    /// Drop every entry, revoking its handles
    pub fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        info!("Clearing {} cached try-on results", self.entries.len());
        for entry in self.entries.values() {
            for url in entry.urls() {
                self.registry.revoke(url);
            }
        }
        self.entries.clear();
    }

    /// Note the product being viewed. Switching to another product purges
    /// the cache; returns whether it did.
    pub fn switch_product(&mut self, product_id: u64) -> bool {
        let previous = self.product.replace(product_id);
        if previous.is_some_and(|p| p != product_id) {
            self.clear();
            return true;
        }
        false
    }

    #[must_use]
    pub fn product(&self) -> Option<u64> {
        self.product
    }

    #[must_use]
    pub fn registry(&self) -> &BlobRegistry {
        &self.registry
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for ResultCache {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemorySettings, UserProfile};

    fn blob_entry(registry: &BlobRegistry) -> CacheEntry {
        CacheEntry::new(registry.create(vec![1u8, 2, 3]))
    }

    #[test]
    fn test_normalized_key() {
        assert_eq!(CacheKey::new(Some(5), None, Some(7)).normalized(), "5-none-7");
        assert_eq!(CacheKey::new(Some(0), None, None).normalized(), "0-none-none");
    }

    #[test]
    fn test_key_from_settings() {
        let settings = MemorySettings::new(UserProfile {
            selected_reference_photo_id: Some(7),
            ..UserProfile::default()
        });
        let key = CacheKey::from_selection(Some(5), None, &settings).unwrap();
        assert_eq!(key, CacheKey::new(Some(5), None, Some(7)));
    }

    #[test]
    fn test_get_after_set() {
        let registry = BlobRegistry::new();
        let mut cache = ResultCache::new(registry.clone());
        let key = CacheKey::new(Some(1), Some(2), None);
        assert!(cache.get(&key).is_none());
        let entry = blob_entry(&registry);
        cache.set(&key, entry.clone());
        assert_eq!(cache.get(&key), Some(&entry));
    }

    #[test]
    fn test_overwrite_revokes_replaced_handle() {
        let registry = BlobRegistry::new();
        let mut cache = ResultCache::new(registry.clone());
        let key = CacheKey::new(Some(1), None, None);
        let first = blob_entry(&registry);
        cache.set(&key, first.clone());
        cache.set(&key, first.clone());
        assert!(registry.is_live(&first.tryon_image));

        let second = blob_entry(&registry);
        cache.set(&key, second.clone());
        assert!(!registry.is_live(&first.tryon_image));
        assert!(registry.is_live(&second.tryon_image));
    }

    #[test]
    fn test_clear_revokes_blobs_only() {
        let registry = BlobRegistry::new();
        let mut cache = ResultCache::new(registry.clone());
        let mut entry = blob_entry(&registry);
        entry.size_image = Some(registry.create(vec![4u8]));
        cache.set(&CacheKey::new(Some(1), None, None), entry);
        cache.set(
            &CacheKey::new(Some(2), None, None),
            CacheEntry::new(ObjectUrl::external("https://example.com/result.png")),
        );
        assert_eq!(registry.live_count(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(registry.live_count(), 0);
        assert!(cache.get(&CacheKey::new(Some(1), None, None)).is_none());
    }

    #[test]
    fn test_switch_product_purges() {
        let registry = BlobRegistry::new();
        let mut cache = ResultCache::new(registry.clone());
        assert!(!cache.switch_product(10));
        cache.set(&CacheKey::default(), blob_entry(&registry));
        assert!(!cache.switch_product(10));
        assert_eq!(cache.len(), 1);
        assert!(cache.switch_product(11));
        assert!(cache.is_empty());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_drop_releases_handles() {
        let registry = BlobRegistry::new();
        {
            let mut cache = ResultCache::new(registry.clone());
            cache.set(&CacheKey::default(), blob_entry(&registry));
        }
        assert_eq!(registry.live_count(), 0);
    }
}
