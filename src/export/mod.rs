//! Image export orchestration
//!
//! Assembles a runnable image from the outputs of a build phase: adds or
//! reuses buildpack layers, app slices, and launcher layers by digest,
//! stamps the metadata labels, wires the launch environment and
//! entrypoint, then saves the image under its requested names.

mod app;
mod buildpacks;
mod cache;
mod entrypoint;
mod env;
mod labels;
mod launcher;
mod report;

pub use env::vars;

use crate::api::Version;
use crate::error::{LaminaError, LaminaResult};
use crate::image::Image;
use crate::layer::{Layer, LayerFactory};
use crate::metadata::{
    BuildMetadata, ExportReport, GroupBuildpack, LauncherMetadata, LayersMetadata, ProjectMetadata,
    RunImageMetadata, StackMetadata,
};
use std::path::PathBuf;
use tracing::{debug, info};

/// Location and provenance of the launcher binary
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub path: PathBuf,
    pub metadata: LauncherMetadata,
}

/// Inputs for one export session
pub struct ExportOptions<'a> {
    pub layers_dir: PathBuf,
    pub app_dir: PathBuf,
    pub working_image: &'a mut dyn Image,
    pub run_image_ref: String,
    /// Layer metadata of the prior image; reuse decisions consult it
    pub orig_metadata: LayersMetadata,
    pub additional_names: Vec<String>,
    pub launcher_config: LauncherConfig,
    pub stack: StackMetadata,
    pub project: ProjectMetadata,
    pub default_process_type: Option<String>,
}

/// Export engine for one detected buildpack group
pub struct Exporter {
    pub buildpacks: Vec<GroupBuildpack>,
    pub layer_factory: Box<dyn LayerFactory>,
    pub platform_api: Version,
}

impl Exporter {
    /// Run one export session against the working image
    pub async fn export(&self, opts: ExportOptions<'_>) -> LaminaResult<ExportReport> {
        let ExportOptions {
            layers_dir,
            app_dir,
            working_image: image,
            run_image_ref,
            orig_metadata,
            additional_names,
            launcher_config,
            stack,
            project,
            default_process_type,
        } = opts;

        let layers_dir = std::path::absolute(&layers_dir)
            .map_err(|e| LaminaError::io("layers dir absolute path", e))?;
        let app_dir = std::path::absolute(&app_dir)
            .map_err(|e| LaminaError::io("app dir absolute path", e))?;

        let top_layer = image
            .top_layer()
            .await
            .map_err(|e| LaminaError::context("get run image top layer SHA", e))?;
        let mut meta = LayersMetadata {
            run_image: RunImageMetadata {
                top_layer,
                reference: run_image_ref,
            },
            stack,
            ..Default::default()
        };

        let mut build_md = BuildMetadata::read(&layers_dir).await?;

        self.add_buildpack_layers(&layers_dir, &orig_metadata, image, &mut meta)
            .await?;

        self.add_app_layers(&app_dir, &build_md.slices, &orig_metadata, image, &mut meta)
            .await
            .map_err(|e| LaminaError::context("exporting app layers", e))?;

        self.add_launcher_layers(
            &layers_dir,
            &launcher_config,
            &build_md,
            &orig_metadata,
            image,
            &mut meta,
        )
        .await?;

        build_md.launcher = launcher_config.metadata.clone();
        self.set_labels(image, &meta, &build_md, &project).await?;

        let launch_md = build_md.to_launch();
        self.set_env(
            image,
            &layers_dir,
            &app_dir,
            default_process_type.as_deref(),
            &launch_md,
        )
        .await?;

        if self.platform_api.at_least(Version::new(0, 6)) {
            debug!("Setting WORKDIR: '{}'", app_dir.display());
            image
                .set_working_dir(&app_dir.to_string_lossy())
                .await
                .map_err(|e| LaminaError::context("setting workdir", e))?;
        }

        let entrypoint = self
            .entrypoint(
                &launch_md,
                default_process_type.as_deref(),
                &build_md.buildpack_default_process_type,
            )
            .map_err(|e| LaminaError::context("determining entrypoint", e))?;
        debug!("Setting ENTRYPOINT: '{entrypoint}'");
        image
            .set_entrypoint(&entrypoint)
            .await
            .map_err(|e| LaminaError::context("setting entrypoint", e))?;

        // Command intentionally empty; the launcher owns dispatch.
        image
            .set_cmd(&[])
            .await
            .map_err(|e| LaminaError::context("setting cmd", e))?;

        let build = self.build_report(&layers_dir).await?;
        info!("Saving image with {} additional name(s)", additional_names.len());
        let mut image_report = image
            .save(&additional_names)
            .await
            .map_err(|e| LaminaError::context("saving image", e))?;
        if self.platform_api.less_than(Version::new(0, 6)) {
            // Callers below 0.6 don't understand the manifest size field.
            image_report.manifest_size = 0;
        }

        Ok(ExportReport {
            build,
            image: image_report,
        })
    }

    pub(crate) fn supports_multicall_launcher(&self) -> bool {
        self.platform_api.at_least(Version::new(0, 4))
    }

    /// Add a layer to the image, or reuse the prior image's layer when
    /// the digests match. Returns the digest recorded in metadata.
    pub(crate) async fn add_or_reuse_layer(
        &self,
        image: &mut dyn Image,
        layer: &Layer,
        previous_sha: &str,
    ) -> LaminaResult<String> {
        if !previous_sha.is_empty() && layer.digest == previous_sha {
            info!("Reusing layer '{}'", layer.id);
            debug!("Layer '{}' SHA: {}", layer.id, layer.digest);
            image
                .reuse_layer(previous_sha)
                .await
                .map_err(|e| LaminaError::context(format!("reusing layer: '{}'", layer.id), e))?;
            return Ok(previous_sha.to_string());
        }

        info!("Adding layer '{}'", layer.id);
        debug!("Layer '{}' SHA: {}", layer.id, layer.digest);
        image
            .add_layer_with_diff_id(&layer.tar_path, &layer.digest)
            .await
            .map_err(|e| LaminaError::context(format!("adding layer: '{}'", layer.id), e))?;
        Ok(layer.digest.clone())
    }
}
