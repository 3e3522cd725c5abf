//! Cache session
//!
//! Persists every cache-classified buildpack layer into the volume
//! cache, reusing the committed generation's tarballs by digest, then
//! writes the cache metadata and commits the new generation.

use crate::cache::Cache;
use crate::error::{LaminaError, LaminaResult};
use crate::export::Exporter;
use crate::layer::{BuildpackLayersDir, Layer};
use crate::metadata::{BuildpackLayersMetadata, CacheMetadata};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

impl Exporter {
    /// Run one cache session over the layers directory
    pub async fn cache(&self, layers_dir: &Path, cache: &mut dyn Cache) -> LaminaResult<()> {
        let orig_meta = cache
            .retrieve_metadata()
            .await
            .map_err(|e| LaminaError::context("getting previous cache metadata", e))?;

        let mut meta = CacheMetadata::default();
        for bp in &self.buildpacks {
            let bp_dir = BuildpackLayersDir::read(layers_dir, bp).await?;
            let orig_bp = orig_meta.metadata_for_buildpack(&bp.id);
            let mut bp_md = BuildpackLayersMetadata {
                id: bp.id.clone(),
                version: bp.version.clone(),
                layers: BTreeMap::new(),
                store: bp_dir.store.clone(),
            };

            for fs_layer in bp_dir.cache_layers() {
                if !fs_layer.has_local_contents() {
                    return Err(LaminaError::UncacheableLayer {
                        id: fs_layer.identifier(),
                    });
                }
                let Some(mut lmd) = fs_layer.metadata.clone() else {
                    continue;
                };

                let layer = self
                    .layer_factory
                    .dir_layer(&fs_layer.identifier(), &fs_layer.path)
                    .await
                    .map_err(|e| {
                        LaminaError::context(
                            format!("creating layer '{}'", fs_layer.identifier()),
                            e,
                        )
                    })?;
                let previous = orig_bp
                    .layers
                    .get(&fs_layer.name)
                    .map(|l| l.sha.clone())
                    .unwrap_or_default();
                lmd.sha = add_or_reuse_cache_layer(cache, &layer, &previous).await?;
                bp_md.layers.insert(fs_layer.name.clone(), lmd);
            }

            meta.buildpacks.push(bp_md);
        }

        cache
            .set_metadata(&meta)
            .await
            .map_err(|e| LaminaError::context("setting cache metadata", e))?;
        cache
            .commit()
            .await
            .map_err(|e| LaminaError::context("committing cache", e))?;
        Ok(())
    }
}

async fn add_or_reuse_cache_layer(
    cache: &mut dyn Cache,
    layer: &Layer,
    previous_sha: &str,
) -> LaminaResult<String> {
    if !previous_sha.is_empty() && layer.digest == previous_sha {
        info!("Reusing cache layer '{}'", layer.id);
        debug!("Layer '{}' SHA: {}", layer.id, layer.digest);
        cache.reuse_layer(previous_sha).await?;
        return Ok(previous_sha.to_string());
    }
    info!("Adding cache layer '{}'", layer.id);
    debug!("Layer '{}' SHA: {}", layer.id, layer.digest);
    cache.add_layer_file(&layer.tar_path, &layer.digest).await?;
    Ok(layer.digest.clone())
}
