//! Volume-backed layer cache
//!
//! Persists layer tarballs and a metadata document across builds. The
//! cache trades generations with a pair of directory renames, so a prior
//! generation survives any single crash point.
//!
//! # Session model
//!
//! | Directory | Role during a session |
//! |-----------|-----------------------|
//! | `staging/` | Write side; recreated empty at construction |
//! | `committed/` | Read side; the last committed generation |
//! | `committed-backup/` | Exists only inside the commit window |
//!
//! An instance owns its root directory exclusively for its lifetime and
//! commits at most once; mutations after a commit fail with
//! [`LaminaError::CacheCommitted`].

pub mod volume;

pub use volume::VolumeCache;

use crate::error::LaminaResult;
use crate::metadata::CacheMetadata;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;

/// File name of the metadata document inside a generation directory
pub const METADATA_FILE: &str = "io.buildpacks.lifecycle.cache.metadata";

/// Abstract layer cache consumed by the export engine
#[async_trait]
pub trait Cache: Send {
    /// Whether a committed generation exists
    fn exists(&self) -> bool;

    /// Identifier of this cache for log messages
    fn name(&self) -> String;

    async fn set_metadata(&mut self, metadata: &CacheMetadata) -> LaminaResult<()>;

    /// The committed generation's metadata; absent or undecodable
    /// metadata degrades to an empty record
    async fn retrieve_metadata(&self) -> LaminaResult<CacheMetadata>;

    /// Stage a layer tarball by copying it; a no-op when the digest is
    /// already staged
    async fn add_layer_file(&mut self, tar_path: &Path, diff_id: &str) -> LaminaResult<()>;

    /// Stage a layer from a stream, truncating any prior staged copy
    async fn add_layer(
        &mut self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        diff_id: &str,
    ) -> LaminaResult<()>;

    /// Carry a committed layer forward into the next generation
    async fn reuse_layer(&mut self, diff_id: &str) -> LaminaResult<()>;

    async fn retrieve_layer(
        &self,
        diff_id: &str,
    ) -> LaminaResult<Box<dyn AsyncRead + Unpin + Send>>;

    async fn retrieve_layer_file(&self, diff_id: &str) -> LaminaResult<PathBuf>;

    async fn has_layer(&self, diff_id: &str) -> LaminaResult<bool>;

    /// Atomically promote the staged generation
    async fn commit(&mut self) -> LaminaResult<()>;
}
