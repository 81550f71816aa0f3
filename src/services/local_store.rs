use crate::services::badge::BadgeUpload;
use crate::services::badge_store::{BadgeStore, badge_extension};
use anyhow::Context;
use std::io;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

/// Badge images on the local filesystem, served by the frontend under
/// `url_prefix`.
#[derive(Debug, Clone)]
pub struct LocalBadgeStore {
    root_dir: PathBuf,
    url_prefix: String,
}

impl LocalBadgeStore {
    pub fn new<P: AsRef<Path>>(root_dir: P, url_prefix: String) -> io::Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        if !root_dir.exists() {
            std::fs::create_dir_all(&root_dir)?;
        }

        Ok(Self {
            root_dir,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, key)
    }

    /// Maps a reference back to a file name under the root, refusing anything
    /// this store did not hand out.
    fn key_for<'a>(&self, reference: &'a str) -> Option<&'a str> {
        let key = reference
            .strip_prefix(self.url_prefix.as_str())?
            .strip_prefix('/')?;
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\'])
            && !key.contains("..");
        valid.then_some(key)
    }
}

#[async_trait::async_trait]
impl BadgeStore for LocalBadgeStore {
    async fn store(&self, upload: &BadgeUpload) -> anyhow::Result<String> {
        let key = format!("{}.{}", Uuid::new_v4(), badge_extension(upload));
        let path = self.root_dir.join(&key);

        fs::create_dir_all(&self.root_dir)
            .await
            .with_context(|| format!("creating {}", self.root_dir.display()))?;
        let mut file = fs::File::create(&path)
            .await
            .with_context(|| format!("creating {}", path.display()))?;
        file.write_all(&upload.bytes).await?;
        file.flush().await?;

        tracing::debug!(path = %path.display(), bytes = upload.bytes.len(), "badge written");
        Ok(self.url_for(&key))
    }

    async fn delete(&self, reference: &str) -> anyhow::Result<()> {
        let key = self
            .key_for(reference)
            .with_context(|| format!("{reference} is not a local badge"))?;
        let path = self.root_dir.join(key);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "badge already gone");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
        }
    }
}
