//! Application layers
//!
//! The app directory is split into slice layers by the layer factory;
//! the final slice is always the unsliced remainder. Reuse is decided by
//! digest match against any app layer of the prior image.

use crate::error::LaminaResult;
use crate::export::Exporter;
use crate::image::Image;
use crate::metadata::{LayerMetadata, LayersMetadata, Slice};
use std::path::Path;
use tracing::{debug, info};

impl Exporter {
    pub(crate) async fn add_app_layers(
        &self,
        app_dir: &Path,
        slices: &[Slice],
        orig: &LayersMetadata,
        image: &mut dyn Image,
        meta: &mut LayersMetadata,
    ) -> LaminaResult<()> {
        let slice_layers = self.layer_factory.slice_layers(app_dir, slices).await?;

        let total = slice_layers.len();
        let mut reused = 0usize;
        for slice in &slice_layers {
            let found = orig.app.iter().any(|prev| prev.sha == slice.digest);
            if found {
                image.reuse_layer(&slice.digest).await?;
                reused += 1;
            } else {
                image
                    .add_layer_with_diff_id(&slice.tar_path, &slice.digest)
                    .await?;
            }
            debug!("Layer '{}' SHA: {}", slice.id, slice.digest);
            meta.app.push(LayerMetadata {
                sha: slice.digest.clone(),
            });
        }

        if reused > 0 {
            info!("Reusing {reused}/{total} app layer(s)");
        }
        if total > reused {
            info!("Adding {}/{} app layer(s)", total - reused, total);
        }
        Ok(())
    }
}
