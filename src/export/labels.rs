//! Metadata labels
//!
//! Serializes the three fixed metadata documents onto the image, then
//! applies any buildpack-provided labels from the build metadata.

use crate::error::{LaminaError, LaminaResult};
use crate::export::Exporter;
use crate::image::Image;
use crate::metadata::{labels, BuildMetadata, LayersMetadata, ProjectMetadata};
use tracing::info;

impl Exporter {
    pub(crate) async fn set_labels(
        &self,
        image: &mut dyn Image,
        meta: &LayersMetadata,
        build_md: &BuildMetadata,
        project: &ProjectMetadata,
    ) -> LaminaResult<()> {
        let data = serde_json::to_string(meta)?;
        info!("Adding label '{}'", labels::LIFECYCLE_METADATA);
        image
            .set_label(labels::LIFECYCLE_METADATA, &data)
            .await
            .map_err(|e| LaminaError::context("set app image metadata label", e))?;

        let build_json = serde_json::to_string(build_md)?;
        info!("Adding label '{}'", labels::BUILD_METADATA);
        image
            .set_label(labels::BUILD_METADATA, &build_json)
            .await
            .map_err(|e| LaminaError::context("set build image metadata label", e))?;

        let project_json = serde_json::to_string(project)?;
        info!("Adding label '{}'", labels::PROJECT_METADATA);
        image
            .set_label(labels::PROJECT_METADATA, &project_json)
            .await
            .map_err(|e| LaminaError::context("set project metadata label", e))?;

        for label in &build_md.labels {
            info!("Adding label '{}'", label.key);
            image.set_label(&label.key, &label.value).await.map_err(|e| {
                LaminaError::context(
                    format!("set buildpack-provided label '{}'", label.key),
                    e,
                )
            })?;
        }
        Ok(())
    }
}
