//! Crash-safe volume cache
//!
//! Two-generation on-disk cache of layer tarballs plus one metadata
//! document. Writes land in `staging/`, reads come from `committed/`,
//! and [`VolumeCache::commit`] swaps the generations with two renames.

use crate::cache::{Cache, METADATA_FILE};
use crate::digest;
use crate::error::{LaminaError, LaminaResult};
use crate::metadata::CacheMetadata;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Layer cache backed by a volume directory
///
/// The root directory must already exist; construction prepares the
/// generation directories inside it.
pub struct VolumeCache {
    committed: bool,
    dir: PathBuf,
    backup_dir: PathBuf,
    staging_dir: PathBuf,
    committed_dir: PathBuf,
}

impl VolumeCache {
    /// Open a cache rooted at an existing directory
    ///
    /// Recreates `staging/` empty, removes any stale backup left by a
    /// crashed commit, and creates `committed/` if absent.
    pub async fn new(dir: impl Into<PathBuf>) -> LaminaResult<Self> {
        let dir = dir.into();
        fs::metadata(&dir)
            .await
            .map_err(|e| LaminaError::io(format!("opening cache directory '{}'", dir.display()), e))?;

        let cache = Self {
            committed: false,
            backup_dir: dir.join("committed-backup"),
            staging_dir: dir.join("staging"),
            committed_dir: dir.join("committed"),
            dir,
        };

        cache.setup_staging_dir().await.map_err(|e| {
            LaminaError::io(
                format!(
                    "initializing staging directory '{}'",
                    cache.staging_dir.display()
                ),
                e,
            )
        })?;

        remove_dir_if_exists(&cache.backup_dir).await.map_err(|e| {
            LaminaError::io(
                format!("removing backup directory '{}'", cache.backup_dir.display()),
                e,
            )
        })?;

        fs::create_dir_all(&cache.committed_dir).await.map_err(|e| {
            LaminaError::io(
                format!(
                    "creating committed directory '{}'",
                    cache.committed_dir.display()
                ),
                e,
            )
        })?;

        Ok(cache)
    }

    async fn setup_staging_dir(&self) -> std::io::Result<()> {
        remove_dir_if_exists(&self.staging_dir).await?;
        fs::create_dir_all(&self.staging_dir).await
    }

    fn staged_tar(&self, diff_id: &str) -> PathBuf {
        digest::tar_path(&self.staging_dir, diff_id)
    }

    fn committed_tar(&self, diff_id: &str) -> PathBuf {
        digest::tar_path(&self.committed_dir, diff_id)
    }

    fn check_uncommitted(&self) -> LaminaResult<()> {
        if self.committed {
            return Err(LaminaError::CacheCommitted);
        }
        Ok(())
    }
}

async fn remove_dir_if_exists(dir: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl Cache for VolumeCache {
    fn exists(&self) -> bool {
        self.committed_dir.is_dir()
    }

    fn name(&self) -> String {
        self.dir.display().to_string()
    }

    async fn set_metadata(&mut self, metadata: &CacheMetadata) -> LaminaResult<()> {
        self.check_uncommitted()?;
        let path = self.staging_dir.join(METADATA_FILE);
        let data = serde_json::to_vec(metadata)?;
        fs::write(&path, data)
            .await
            .map_err(|e| LaminaError::io(format!("creating metadata file '{}'", path.display()), e))
    }

    async fn retrieve_metadata(&self) -> LaminaResult<CacheMetadata> {
        let path = self.committed_dir.join(METADATA_FILE);
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CacheMetadata::default()),
            Err(e) => {
                return Err(LaminaError::io(
                    format!("opening metadata file '{}'", path.display()),
                    e,
                ))
            }
        };
        // Corrupt metadata must not abort a build; the layer files are
        // authoritative.
        Ok(serde_json::from_slice(&content).unwrap_or_default())
    }

    async fn add_layer_file(&mut self, tar_path: &Path, diff_id: &str) -> LaminaResult<()> {
        self.check_uncommitted()?;
        let staged = self.staged_tar(diff_id);
        if staged.exists() {
            // don't waste time rewriting an identical layer
            return Ok(());
        }
        fs::copy(tar_path, &staged)
            .await
            .map_err(|e| LaminaError::io(format!("caching layer ({diff_id})"), e))?;
        Ok(())
    }

    async fn add_layer(
        &mut self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        diff_id: &str,
    ) -> LaminaResult<()> {
        self.check_uncommitted()?;
        let staged = self.staged_tar(diff_id);
        let mut file = fs::File::create(&staged)
            .await
            .map_err(|e| LaminaError::io("create layer file in cache", e))?;
        tokio::io::copy(reader, &mut file)
            .await
            .map_err(|e| LaminaError::io("copying layer to tar file", e))?;
        file.flush()
            .await
            .map_err(|e| LaminaError::io("copying layer to tar file", e))?;
        Ok(())
    }

    async fn reuse_layer(&mut self, diff_id: &str) -> LaminaResult<()> {
        self.check_uncommitted()?;
        match fs::hard_link(self.committed_tar(diff_id), self.staged_tar(diff_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(LaminaError::io(format!("reusing layer ({diff_id})"), e)),
        }
    }

    async fn retrieve_layer(
        &self,
        diff_id: &str,
    ) -> LaminaResult<Box<dyn AsyncRead + Unpin + Send>> {
        let path = self.retrieve_layer_file(diff_id).await?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| LaminaError::io(format!("opening layer with SHA '{diff_id}'"), e))?;
        Ok(Box::new(file))
    }

    async fn retrieve_layer_file(&self, diff_id: &str) -> LaminaResult<PathBuf> {
        let path = self.committed_tar(diff_id);
        match fs::metadata(&path).await {
            Ok(_) => Ok(path),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(LaminaError::CacheLayerNotFound {
                diff_id: diff_id.to_string(),
            }),
            Err(e) => Err(LaminaError::io(
                format!("retrieving layer with SHA '{diff_id}'"),
                e,
            )),
        }
    }

    async fn has_layer(&self, diff_id: &str) -> LaminaResult<bool> {
        match fs::metadata(self.committed_tar(diff_id)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LaminaError::io(
                format!("retrieving layer with SHA '{diff_id}'"),
                e,
            )),
        }
    }

    async fn commit(&mut self) -> LaminaResult<()> {
        self.check_uncommitted()?;
        // Mark committed up front; a failed commit must not accept
        // further mutations either.
        self.committed = true;

        fs::rename(&self.committed_dir, &self.backup_dir)
            .await
            .map_err(|e| LaminaError::io("backing up cache", e))?;

        if let Err(commit_err) = fs::rename(&self.staging_dir, &self.committed_dir).await {
            return match fs::rename(&self.backup_dir, &self.committed_dir).await {
                Ok(()) => Err(LaminaError::io("committing cache", commit_err)),
                Err(rollback_err) => Err(LaminaError::io("rolling back cache", rollback_err)),
            };
        }

        // Best-effort; a leftover backup is cleaned by the next
        // construction.
        let _ = fs::remove_dir_all(&self.backup_dir).await;
        Ok(())
    }
}
