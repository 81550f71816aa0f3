use crate::config::BadgeStorageConfig;
use crate::services::badge::BadgeUpload;
use crate::services::{CloudinaryStore, LocalBadgeStore};
use std::sync::Arc;

/// Where badge images live. References returned by `store` are what the event
/// record keeps and what `delete` later receives.
#[async_trait::async_trait]
pub trait BadgeStore: Send + Sync {
    async fn store(&self, upload: &BadgeUpload) -> anyhow::Result<String>;
    async fn delete(&self, reference: &str) -> anyhow::Result<()>;
}

pub fn badge_store_from_config(config: &BadgeStorageConfig) -> anyhow::Result<Arc<dyn BadgeStore>> {
    let store: Arc<dyn BadgeStore> = match config {
        BadgeStorageConfig::Local {
            root_dir,
            url_prefix,
        } => Arc::new(LocalBadgeStore::new(root_dir, url_prefix.clone())?),
        BadgeStorageConfig::Cloudinary(cloudinary) => {
            Arc::new(CloudinaryStore::new(cloudinary.clone())?)
        }
    };
    Ok(store)
}

/// File extension for a stored badge: content type first, then the uploaded
/// file name.
pub fn badge_extension(upload: &BadgeUpload) -> String {
    let from_mime = match upload.content_type.as_str() {
        "image/jpeg" => Some("jpg"),
        other => mime_guess::get_mime_extensions_str(other).and_then(|exts| exts.first().copied()),
    };

    from_mime
        .map(str::to_string)
        .or_else(|| {
            upload
                .file_name
                .as_deref()
                .and_then(|name| name.rsplit_once('.'))
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        })
        .unwrap_or_else(|| "bin".to_string())
}
