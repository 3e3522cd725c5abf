//! Working image abstraction
//!
//! The exporter mutates a caller-owned image handle through this trait.
//! Backends (daemon, registry, OCI layout) implement it; the engine never
//! sees past it.

use crate::error::LaminaResult;
use crate::metadata::ImageReport;
use async_trait::async_trait;
use std::path::Path;

/// Abstract image being assembled by the export session
#[async_trait]
pub trait Image: Send {
    /// Digest of the topmost layer of the run image
    async fn top_layer(&self) -> LaminaResult<String>;

    /// Append a layer from a tarball with a precomputed diff id
    async fn add_layer_with_diff_id(&mut self, tar_path: &Path, diff_id: &str) -> LaminaResult<()>;

    /// Append a layer already present in the prior image, by digest
    async fn reuse_layer(&mut self, diff_id: &str) -> LaminaResult<()>;

    async fn set_label(&mut self, key: &str, value: &str) -> LaminaResult<()>;

    async fn set_env(&mut self, key: &str, value: &str) -> LaminaResult<()>;

    /// Current value of an environment variable, if set
    async fn env(&self, key: &str) -> LaminaResult<Option<String>>;

    async fn set_entrypoint(&mut self, entrypoint: &str) -> LaminaResult<()>;

    async fn set_cmd(&mut self, cmd: &[String]) -> LaminaResult<()>;

    async fn set_working_dir(&mut self, dir: &str) -> LaminaResult<()>;

    /// Save the image under its primary and additional names
    async fn save(&mut self, additional_names: &[String]) -> LaminaResult<ImageReport>;
}
