//! Launcher layers
//!
//! Three layers close out the image: the launcher binary, the config
//! directory, and (for multicall-capable platforms with at least one
//! process) the process-types symlink layer.

use crate::error::{LaminaError, LaminaResult};
use crate::export::{Exporter, LauncherConfig};
use crate::image::Image;
use crate::metadata::{BuildMetadata, LayersMetadata};
use std::path::Path;

impl Exporter {
    pub(crate) async fn add_launcher_layers(
        &self,
        layers_dir: &Path,
        launcher_config: &LauncherConfig,
        build_md: &BuildMetadata,
        orig: &LayersMetadata,
        image: &mut dyn Image,
        meta: &mut LayersMetadata,
    ) -> LaminaResult<()> {
        let launcher_layer = self
            .layer_factory
            .launcher_layer(&launcher_config.path)
            .await
            .map_err(|e| LaminaError::context("creating launcher layer", e))?;
        meta.launcher.sha = self
            .add_or_reuse_layer(image, &launcher_layer, &orig.launcher.sha)
            .await
            .map_err(|e| LaminaError::context("exporting launcher layer", e))?;

        let config_layer = self
            .layer_factory
            .dir_layer("config", &layers_dir.join("config"))
            .await
            .map_err(|e| LaminaError::context("creating layer 'config'", e))?;
        meta.config.sha = self
            .add_or_reuse_layer(image, &config_layer, &orig.config.sha)
            .await
            .map_err(|e| LaminaError::context("exporting config layer", e))?;

        self.add_process_types_layer(build_md, orig, image, meta)
            .await
    }

    async fn add_process_types_layer(
        &self,
        build_md: &BuildMetadata,
        orig: &LayersMetadata,
        image: &mut dyn Image,
        meta: &mut LayersMetadata,
    ) -> LaminaResult<()> {
        if !self.supports_multicall_launcher() || build_md.processes.is_empty() {
            return Ok(());
        }

        let launch_md = build_md.to_launch();
        let layer = self
            .layer_factory
            .process_types_layer(&launch_md)
            .await
            .map_err(|e| LaminaError::context("creating layer 'process-types'", e))?;
        meta.process_types.sha = self
            .add_or_reuse_layer(image, &layer, &orig.process_types.sha)
            .await
            .map_err(|e| LaminaError::context("exporting layer 'process-types'", e))?;
        Ok(())
    }
}
