//! Layer production seam and buildpack layer directories

pub mod dir;

pub use dir::{BuildpackLayer, BuildpackLayersDir};

use crate::error::LaminaResult;
use crate::launch;
use crate::metadata::Slice;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A prepared layer tarball on local disk
///
/// Ownership of the tarball transfers to the image on a successful add.
#[derive(Debug, Clone)]
pub struct Layer {
    pub id: String,
    pub tar_path: PathBuf,
    pub digest: String,
}

/// Producer of layer tarballs
///
/// Implementations should be idempotent on identical inputs: producing
/// the same directory twice yields the same digest.
#[async_trait]
pub trait LayerFactory: Send + Sync {
    /// Tar up a directory as a single layer
    async fn dir_layer(&self, id: &str, dir: &Path) -> LaminaResult<Layer>;

    /// Layer containing the launcher binary
    async fn launcher_layer(&self, path: &Path) -> LaminaResult<Layer>;

    /// Layer of per-process-type launcher symlinks
    async fn process_types_layer(&self, metadata: &launch::Metadata) -> LaminaResult<Layer>;

    /// Application layers, one per slice plus the unsliced remainder last
    async fn slice_layers(&self, app_dir: &Path, slices: &[Slice]) -> LaminaResult<Vec<Layer>>;
}
