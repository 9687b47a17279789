use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Category of an uploaded image; decides the subdirectory and accepted formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Profile,
    Qris,
    Product,
    Payment,
}

impl AssetKind {
    pub fn dir(&self) -> &'static str {
        match self {
            AssetKind::Profile => "profiles",
            AssetKind::Qris => "qris",
            AssetKind::Product => "products",
            AssetKind::Payment => "payments",
        }
    }

    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            AssetKind::Product => &["png", "jpg", "jpeg"],
            _ => &["png", "jpg", "jpeg", "webp"],
        }
    }
}

/// File part taken from a multipart request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { file_name: file_name.into(), bytes: bytes.into() }
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
    public_base_url: String,
    max_bytes: usize,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str, max_bytes: usize) -> Self {
        Self { root: root.into(), public_base_url: public_base_url.trim_end_matches('/').to_string(), max_bytes }
    }

    pub fn from_config(cfg: &configs::StorageConfig) -> Self {
        Self::new(&cfg.assets_dir, &cfg.public_base_url, cfg.max_upload_bytes)
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Prefix every URL produced by this store starts with.
    fn url_prefix(&self) -> String {
        format!("{}/assets/", self.public_base_url)
    }

    /// Size and extension checks; nothing is written.
    pub fn validate(&self, kind: AssetKind, upload: &Upload) -> Result<String, ServiceError> {
        if upload.bytes.is_empty() {
            return Err(ServiceError::validation("uploaded file is empty"));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(ServiceError::validation(format!(
                "file size exceeds {} KB",
                self.max_bytes / 1024
            )));
        }
        let allowed = kind.allowed_extensions();
        match upload.extension() {
            Some(ext) if allowed.contains(&ext.as_str()) => Ok(ext),
            _ => Err(ServiceError::validation(format!("only {} files are allowed", allowed.join(", ")))),
        }
    }

    /// Write the upload under `<root>/<kind>/<uuid>.<ext>` and return its public URL.
    pub async fn save(&self, kind: AssetKind, upload: &Upload) -> Result<String, ServiceError> {
        let ext = self.validate(kind, upload)?;
        let dir = self.root.join(kind.dir());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ServiceError::Storage(format!("cannot create {}: {e}", dir.display())))?;
        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &upload.bytes)
            .await
            .map_err(|e| ServiceError::Storage(format!("cannot write {}: {e}", path.display())))?;
        info!(kind = kind.dir(), file = %file_name, bytes = upload.bytes.len(), "asset_saved");
        Ok(format!("{}{}/{}", self.url_prefix(), kind.dir(), file_name))
    }

    /// Map a URL produced by [`save`](Self::save) back to its file path.
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let rest = url.strip_prefix(&self.url_prefix())?;
        let (dir, file) = rest.split_once('/')?;
        let known = [AssetKind::Profile, AssetKind::Qris, AssetKind::Product, AssetKind::Payment]
            .iter()
            .any(|k| k.dir() == dir);
        if !known || file.is_empty() || file.contains('/') || file.contains("..") {
            return None;
        }
        Some(self.root.join(dir).join(file))
    }

    /// Delete a stored file by URL. Foreign URLs and missing files are ignored.
    pub async fn remove_by_url(&self, url: &str) -> Result<bool, ServiceError> {
        let Some(path) = self.path_for_url(url) else {
            debug!(%url, "not a local asset, skipping removal");
            return Ok(false);
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "asset_removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ServiceError::Storage(format!("cannot remove {}: {e}", path.display()))),
        }
    }

    /// Best-effort cleanup used after the owning row is already gone.
    pub async fn discard(&self, url: &str) {
        if let Err(e) = self.remove_by_url(url).await {
            warn!(%url, error = %e, "asset cleanup failed");
        }
    }
}
