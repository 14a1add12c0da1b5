use std::{
    fmt::Debug,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::Utc;
use log::*;
use tempfile::NamedTempFile;

use crate::merchant::{MerchantError, MerchantProfile, QrImageDecoder};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Process-wide holder of the active merchant profile.
///
/// Reads vastly outnumber writes, so the profile sits behind an [`RwLock`]. Readers always get a complete profile
/// clone; a replacement is written to disk (when the store is file-backed) while the write lock is held, so memory and
/// disk never disagree about which profile is active.
#[derive(Clone)]
pub struct MerchantProfileStore {
    profile: Arc<RwLock<Option<MerchantProfile>>>,
    path: Option<PathBuf>,
    max_upload_size: usize,
}

impl Debug for MerchantProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MerchantProfileStore({:?}, configured: {})", self.path, self.is_configured())
    }
}

impl MerchantProfileStore {
    /// A store that forgets the profile when the process exits.
    pub fn in_memory() -> Self {
        Self { profile: Arc::new(RwLock::new(None)), path: None, max_upload_size: DEFAULT_MAX_UPLOAD_BYTES }
    }

    /// A store backed by the JSON file at `path`. A profile saved by an earlier run is loaded immediately. A missing
    /// file just means no merchant has been configured yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MerchantError> {
        let path = path.as_ref().to_path_buf();
        let profile = if path.exists() {
            let data = fs::read_to_string(&path)?;
            let profile = serde_json::from_str::<MerchantProfile>(&data)?;
            info!("🏪️ Loaded merchant profile for {} from {}", profile.display_name(), path.display());
            Some(profile)
        } else {
            info!("🏪️ No merchant profile found at {}. Upload a QRIS code to configure the store.", path.display());
            None
        };
        Ok(Self {
            profile: Arc::new(RwLock::new(profile)),
            path: Some(path),
            max_upload_size: DEFAULT_MAX_UPLOAD_BYTES,
        })
    }

    pub fn with_max_upload_size(mut self, max_upload_size: usize) -> Self {
        self.max_upload_size = max_upload_size;
        self
    }

    pub fn max_upload_size(&self) -> usize {
        self.max_upload_size
    }

    /// A snapshot of the active profile
    pub fn current(&self) -> Option<MerchantProfile> {
        self.read().clone()
    }

    pub fn is_configured(&self) -> bool {
        self.read().is_some()
    }

    /// Decodes and validates an uploaded static QR image and makes it the active profile, replacing any previous one.
    pub fn upload(&self, image: &[u8], decoder: &dyn QrImageDecoder) -> Result<MerchantProfile, MerchantError> {
        if image.is_empty() {
            return Err(MerchantError::InvalidImage("The upload is empty".into()));
        }
        if image.len() > self.max_upload_size {
            return Err(MerchantError::InvalidImage(format!(
                "The upload is {} bytes. The limit is {} bytes",
                image.len(),
                self.max_upload_size
            )));
        }
        let payload = decoder.decode(image)?;
        let profile = MerchantProfile::from_payload(&payload, Utc::now())?;
        self.replace(profile.clone())?;
        info!(
            "🏪️ Merchant profile updated. {} ({}), merchant id '{}'",
            profile.display_name(),
            profile.city.as_deref().unwrap_or("no city"),
            profile.merchant_id
        );
        Ok(profile)
    }

    /// Makes `profile` the active profile. If the store is file-backed and the profile cannot be saved, the previous
    /// profile stays active.
    pub fn replace(&self, profile: MerchantProfile) -> Result<(), MerchantError> {
        let mut guard = self.write();
        if let Some(path) = &self.path {
            persist(path, &profile)?;
        }
        *guard = Some(profile);
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<MerchantProfile>> {
        // A panic elsewhere cannot leave a half-written profile behind, so a poisoned lock is still usable
        self.profile.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<MerchantProfile>> {
        self.profile.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Writes the profile to a temporary file next to `path` and moves it into place.
fn persist(path: &Path, profile: &MerchantProfile) -> Result<(), MerchantError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;
    let mut file = NamedTempFile::new_in(&dir)?;
    serde_json::to_writer_pretty(&mut file, profile)?;
    file.flush()?;
    file.persist(path).map_err(|e| MerchantError::Storage(e.to_string()))?;
    debug!("🏪️ Merchant profile saved to {}", path.display());
    Ok(())
}
