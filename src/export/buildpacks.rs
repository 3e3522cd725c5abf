//! Buildpack-provided layers
//!
//! Walks each buildpack's layer directory in group order, adding or
//! reusing every launch-classified layer and accumulating the per-layer
//! metadata that the next build consults for reuse.

use crate::error::{LaminaError, LaminaResult};
use crate::export::Exporter;
use crate::image::Image;
use crate::layer::BuildpackLayersDir;
use crate::metadata::{BuildpackLayersMetadata, LayersMetadata};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

impl Exporter {
    pub(crate) async fn add_buildpack_layers(
        &self,
        layers_dir: &Path,
        orig: &LayersMetadata,
        image: &mut dyn Image,
        meta: &mut LayersMetadata,
    ) -> LaminaResult<()> {
        for bp in &self.buildpacks {
            let bp_dir = BuildpackLayersDir::read(layers_dir, bp).await?;
            let orig_bp = orig.metadata_for_buildpack(&bp.id);
            let mut bp_md = BuildpackLayersMetadata {
                id: bp.id.clone(),
                version: bp.version.clone(),
                layers: BTreeMap::new(),
                store: bp_dir.store.clone(),
            };

            for fs_layer in bp_dir.launch_layers() {
                // launch classification implies parsed metadata
                let Some(mut lmd) = fs_layer.metadata.clone() else {
                    continue;
                };

                if fs_layer.has_local_contents() {
                    let layer = self
                        .layer_factory
                        .dir_layer(&fs_layer.identifier(), &fs_layer.path)
                        .await
                        .map_err(|e| LaminaError::context("creating layer", e))?;
                    let previous = orig_bp
                        .layers
                        .get(&fs_layer.name)
                        .map(|l| l.sha.clone())
                        .unwrap_or_default();
                    lmd.sha = self.add_or_reuse_layer(image, &layer, &previous).await?;
                } else {
                    // Reuse-only: the layer must come from the prior image.
                    if lmd.cache {
                        return Err(LaminaError::CachedLayerMissingContents {
                            id: fs_layer.identifier(),
                        });
                    }
                    let Some(orig_layer) = orig_bp.layers.get(&fs_layer.name) else {
                        return Err(LaminaError::ReuseWithoutMetadata {
                            id: fs_layer.identifier(),
                        });
                    };
                    info!("Reusing layer '{}'", fs_layer.identifier());
                    debug!("Layer '{}' SHA: {}", fs_layer.identifier(), orig_layer.sha);
                    image.reuse_layer(&orig_layer.sha).await.map_err(|e| {
                        LaminaError::context(
                            format!("reusing layer: '{}'", fs_layer.identifier()),
                            e,
                        )
                    })?;
                    lmd.sha = orig_layer.sha.clone();
                }

                bp_md.layers.insert(fs_layer.name.clone(), lmd);
            }

            meta.buildpacks.push(bp_md);

            let malformed = bp_dir.malformed_layers();
            if !malformed.is_empty() {
                return Err(LaminaError::MalformedLayers { ids: malformed });
            }
        }
        Ok(())
    }
}
