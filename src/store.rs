//! Persistence collaborators: captured photos and the user's profile settings.
//!
//! Both are constructed explicitly and owned by the caller. The image store
//! has an `init()`/`close()` lifecycle and refuses to work while closed.

use crate::template::PoseKind;
use crate::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Store-assigned image identifier
pub type ImageId = u64;

/// A persisted photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub id: ImageId,
    pub kind: PoseKind,
    /// Encoded image bytes
    pub data: Vec<u8>,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

/// Blob storage for captured photos
pub trait ImageStore: Send {
    /// Open the store. Calling again while open is a no-op.
    ///
    /// # Errors
    ///
    /// `StoreError` if the backing storage cannot be opened
    fn init(&mut self) -> Result<()>;

    /// Close the store. Safe to call when not open.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Persist a photo and return its id
    ///
    /// # Errors
    ///
    /// `StoreError` if the store is closed or the write fails
    fn save(&mut self, data: Vec<u8>, kind: PoseKind) -> Result<ImageId>;

    /// # Errors
    ///
    /// `StoreError` if the store is closed
    fn get(&self, id: ImageId) -> Result<Option<StoredImage>>;

    /// Most recent photo of the given kind
    ///
    /// # Errors
    ///
    /// `StoreError` if the store is closed
    fn get_latest(&self, kind: PoseKind) -> Result<Option<StoredImage>>;

    /// Remove a photo. Removing an unknown id is not an error.
    ///
    /// # Errors
    ///
    /// `StoreError` if the store is closed
    fn delete(&mut self, id: ImageId) -> Result<()>;

    /// # Errors
    ///
    /// `StoreError` if the store is closed
    fn clear_all(&mut self) -> Result<()>;
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

fn closed() -> Error {
    Error::StoreError("Image store is not open".to_string())
}

/// In-memory image store
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    open: bool,
    next_id: ImageId,
    last_timestamp: u64,
    images: BTreeMap<ImageId, StoredImage>,
}

impl MemoryImageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored photos
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    // Strictly increasing so "latest" is unambiguous within one process
    fn next_timestamp(&mut self) -> u64 {
        self.last_timestamp = now_ms().max(self.last_timestamp + 1);
        self.last_timestamp
    }
}

impl ImageStore for MemoryImageStore {
    fn init(&mut self) -> Result<()> {
        if !self.open {
            debug!("Image store opened");
            self.open = true;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn save(&mut self, data: Vec<u8>, kind: PoseKind) -> Result<ImageId> {
        if !self.open {
            return Err(closed());
        }
        self.next_id += 1;
        let id = self.next_id;
        let timestamp_ms = self.next_timestamp();
        debug!("Saved {} image {} ({} bytes)", kind, id, data.len());
        self.images.insert(
            id,
            StoredImage {
                id,
                kind,
                data,
                timestamp_ms,
            },
        );
        Ok(id)
    }

    fn get(&self, id: ImageId) -> Result<Option<StoredImage>> {
        if !self.open {
            return Err(closed());
        }
        Ok(self.images.get(&id).cloned())
    }

    fn get_latest(&self, kind: PoseKind) -> Result<Option<StoredImage>> {
        if !self.open {
            return Err(closed());
        }
        Ok(self
            .images
            .values()
            .filter(|img| img.kind == kind)
            .max_by_key(|img| (img.timestamp_ms, img.id))
            .cloned())
    }

    fn delete(&mut self, id: ImageId) -> Result<()> {
        if !self.open {
            return Err(closed());
        }
        self.images.remove(&id);
        Ok(())
    }

    fn clear_all(&mut self) -> Result<()> {
        if !self.open {
            return Err(closed());
        }
        self.images.clear();
        Ok(())
    }
}

/// The user's profile as kept by the settings store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    /// Photo chosen as the try-on reference
    pub selected_reference_photo_id: Option<ImageId>,
}

/// Profile settings collaborator
pub trait SettingsStore: Send {
    /// # Errors
    ///
    /// `StoreError` if the settings cannot be read
    fn selected_reference_photo_id(&self) -> Result<Option<ImageId>>;

    /// # Errors
    ///
    /// `StoreError` if the settings cannot be written
    fn set_selected_reference_photo_id(&mut self, id: Option<ImageId>) -> Result<()>;
}

/// In-memory settings
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    profile: UserProfile,
}

impl MemorySettings {
    #[must_use]
    pub fn new(profile: UserProfile) -> Self {
        Self { profile }
    }

    #[must_use]
    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn set_profile(&mut self, profile: UserProfile) {
        self.profile = profile;
    }
}

impl SettingsStore for MemorySettings {
    fn selected_reference_photo_id(&self) -> Result<Option<ImageId>> {
        Ok(self.profile.selected_reference_photo_id)
    }

    fn set_selected_reference_photo_id(&mut self, id: Option<ImageId>) -> Result<()> {
        self.profile.selected_reference_photo_id = id;
        Ok(())
    }
}
