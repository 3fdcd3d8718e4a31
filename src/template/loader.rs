use super::{PoseTemplate, ValidationZone};
use crate::{Error, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Where template bytes come from
pub trait TemplateSource {
    /// Fetch the raw bytes stored under `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be read
    fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}

/// Templates stored below a directory on disk
#[derive(Debug, Clone)]
pub struct FsTemplateSource {
    root: PathBuf,
}

impl FsTemplateSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateSource for FsTemplateSource {
    fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.root.join(path.trim_start_matches('/'));
        debug!("Reading template from {}", full.display());
        Ok(std::fs::read(full)?)
    }
}

/// Templates held in memory, keyed by path
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateSource {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryTemplateSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(path.into(), bytes);
    }
}

impl TemplateSource for MemoryTemplateSource {
    fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("No such template: {path}")))
    }
}

/// Decoded templates keyed by path and zone set.
///
/// Each path is fetched and decoded once. Asking for the same path with
/// another zone set reuses the decoded pixels. Only successful loads are
/// cached, so a failed path is fetched again on the next request.
#[derive(Debug, Default)]
pub struct TemplateCache {
    templates: HashMap<String, Vec<Arc<PoseTemplate>>>,
}

impl TemplateCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a template, reusing the cached copy when the path was seen
    /// before with the same zones
    ///
    /// # Errors
    ///
    /// Returns `TemplateLoadError` if the fetch or the PNG decode fails
    pub fn load(&mut self, source: &dyn TemplateSource, path: &str, zones: &[ValidationZone]) -> Result<Arc<PoseTemplate>> {
        let cached = self.templates.get(path);
        if let Some(template) = cached.and_then(|list| list.iter().find(|t| t.zones() == zones)) {
            return Ok(Arc::clone(template));
        }

        let template = match cached.and_then(|list| list.first()) {
            Some(decoded) => {
                debug!("Reusing pixels of {} for {} zones", path, zones.len());
                PoseTemplate::new(decoded.index().clone(), zones)
            }
            None => {
                let bytes = source.fetch(path).map_err(|e| Error::template(path, e))?;
                let template = PoseTemplate::decode(&bytes, zones).map_err(|e| Error::template(path, e))?;
                info!(
                    "Loaded template {} ({}x{}, {} marker pixels)",
                    path,
                    template.width(),
                    template.height(),
                    template.pixel_count()
                );
                template
            }
        };

        let template = Arc::new(template);
        self.templates
            .entry(path.to_string())
            .or_default()
            .push(Arc::clone(&template));
        Ok(template)
    }

    #[must_use]
    pub fn get(&self, path: &str, zones: &[ValidationZone]) -> Option<Arc<PoseTemplate>> {
        self.templates
            .get(path)?
            .iter()
            .find(|t| t.zones() == zones)
            .cloned()
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.templates.contains_key(path)
    }

    pub fn clear(&mut self) {
        self.templates.clear();
    }

    /// Number of cached (path, zones) templates
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{test_png, FRONT_POSE_ZONES, SIDE_POSE_ZONES};
    use std::cell::Cell;

    struct CountingSource {
        inner: MemoryTemplateSource,
        fetches: Cell<usize>,
    }

    impl TemplateSource for CountingSource {
        fn fetch(&self, path: &str) -> Result<Vec<u8>> {
            self.fetches.set(self.fetches.get() + 1);
            self.inner.fetch(path)
        }
    }

    fn source() -> CountingSource {
        let mut inner = MemoryTemplateSource::new();
        inner.insert("/front.png", test_png::sample());
        inner.insert("/broken.png", b"garbage".to_vec());
        CountingSource {
            inner,
            fetches: Cell::new(0),
        }
    }

    #[test]
    fn test_second_load_is_cached() {
        let src = source();
        let mut cache = TemplateCache::new();
        let first = cache.load(&src, "/front.png", FRONT_POSE_ZONES).unwrap();
        let second = cache.load(&src, "/front.png", FRONT_POSE_ZONES).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(src.fetches.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zone_sets_cached_separately() {
        let src = source();
        let mut cache = TemplateCache::new();
        let front = cache.load(&src, "/front.png", FRONT_POSE_ZONES).unwrap();
        let side = cache.load(&src, "/front.png", SIDE_POSE_ZONES).unwrap();
        assert_eq!(front.zones(), FRONT_POSE_ZONES);
        assert_eq!(side.zones(), SIDE_POSE_ZONES);
        assert_eq!(front.index(), side.index());
        assert!(side.zone_coordinates("wrist").is_some());
        assert!(front.zone_coordinates("wrist").is_none());

        let again = cache.load(&src, "/front.png", SIDE_POSE_ZONES).unwrap();
        assert!(Arc::ptr_eq(&side, &again));
        assert!(Arc::ptr_eq(&cache.get("/front.png", FRONT_POSE_ZONES).unwrap(), &front));
        assert_eq!(src.fetches.get(), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let src = source();
        let mut cache = TemplateCache::new();
        for _ in 0..2 {
            let err = cache.load(&src, "/broken.png", FRONT_POSE_ZONES).unwrap_err();
            assert!(matches!(err, Error::TemplateLoadError { ref path, .. } if path == "/broken.png"));
        }
        assert_eq!(src.fetches.get(), 2);
        assert!(!cache.contains("/broken.png"));
    }

    #[test]
    fn test_missing_path() {
        let src = source();
        let mut cache = TemplateCache::new();
        assert!(matches!(
            cache.load(&src, "/side.png", FRONT_POSE_ZONES),
            Err(Error::TemplateLoadError { .. })
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fs_source_missing_file() {
        let src = FsTemplateSource::new("/nonexistent-template-root");
        assert!(matches!(src.fetch("/front.png"), Err(Error::Io(_))));
    }
}
