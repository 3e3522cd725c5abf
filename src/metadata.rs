//! Metadata documents written to image labels and reports
//!
//! The exported image carries three JSON labels: the lifecycle's layer
//! metadata (reuse source for the next build), the build metadata, and
//! the project metadata. The build metadata itself is parsed from
//! `<layersDir>/config/metadata.toml`.

use crate::error::{LaminaError, LaminaResult};
use crate::launch::{self, Process};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Label keys stamped on every exported image
pub mod labels {
    /// Aggregated layer metadata, consulted for reuse on the next build
    pub const LIFECYCLE_METADATA: &str = "io.buildpacks.lifecycle.metadata";
    /// Build metadata: processes, group, BOM, launcher provenance
    pub const BUILD_METADATA: &str = "io.buildpacks.build.metadata";
    /// Project source provenance
    pub const PROJECT_METADATA: &str = "io.buildpacks.project.metadata";
}

/// Aggregated layer metadata for one exported image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayersMetadata {
    #[serde(default)]
    pub buildpacks: Vec<BuildpackLayersMetadata>,
    #[serde(default)]
    pub app: Vec<LayerMetadata>,
    #[serde(default)]
    pub launcher: LayerMetadata,
    #[serde(default)]
    pub config: LayerMetadata,
    #[serde(default, rename = "process-types")]
    pub process_types: LayerMetadata,
    #[serde(default, rename = "runImage")]
    pub run_image: RunImageMetadata,
    #[serde(default)]
    pub stack: StackMetadata,
}

impl LayersMetadata {
    /// The metadata entry for a buildpack id; missing ids yield an empty
    /// entry rather than an error.
    pub fn metadata_for_buildpack(&self, id: &str) -> BuildpackLayersMetadata {
        self.buildpacks
            .iter()
            .find(|bp| bp.id == id)
            .cloned()
            .unwrap_or_default()
    }
}

/// A single layer identified by digest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerMetadata {
    #[serde(default)]
    pub sha: String,
}

/// Per-buildpack layer metadata recorded in the image label
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildpackLayersMetadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub layers: BTreeMap<String, BuildpackLayerMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<BuildpackStore>,
}

/// Metadata of one buildpack-provided layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildpackLayerMetadata {
    #[serde(default)]
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub build: bool,
    #[serde(default)]
    pub launch: bool,
    #[serde(default)]
    pub cache: bool,
}

/// Persistent store carried across builds via `store.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildpackStore {
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Run image the exported image was built on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunImageMetadata {
    #[serde(default, rename = "topLayer")]
    pub top_layer: String,
    #[serde(default)]
    pub reference: String,
}

/// Stack metadata carried through from the platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackMetadata {
    #[serde(default, rename = "runImage", alias = "run-image")]
    pub run_image: StackRunImage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackRunImage {
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mirrors: Vec<String>,
}

/// One buildpack of the detected group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupBuildpack {
    pub id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api: String,
}

impl GroupBuildpack {
    /// Declared buildpack API; group entries the detector left unstamped
    /// count as 0.1
    pub fn api_version(&self) -> LaminaResult<crate::api::Version> {
        if self.api.is_empty() {
            return Ok(crate::api::Version::new(0, 1));
        }
        crate::api::Version::parse(&self.api)
    }
}

/// Build metadata parsed from `<layersDir>/config/metadata.toml`
///
/// `slices` and the buildpack default process type are build-time inputs
/// only and stay out of the serialized image label.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildMetadata {
    #[serde(default)]
    pub processes: Vec<Process>,
    #[serde(default, skip_serializing)]
    pub slices: Vec<Slice>,
    #[serde(default)]
    pub buildpacks: Vec<GroupBuildpack>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub launcher: LauncherMetadata,
    #[serde(default)]
    pub bom: Vec<BomEntry>,
    #[serde(
        default,
        skip_serializing,
        rename = "buildpack-default-process-type"
    )]
    pub buildpack_default_process_type: String,
}

impl BuildMetadata {
    /// Parse the build metadata document from a layers directory
    pub async fn read(layers_dir: &Path) -> LaminaResult<Self> {
        let path = launch::metadata_file_path(layers_dir);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LaminaError::io(format!("reading build metadata {}", path.display()), e))?;
        toml::from_str(&content).map_err(|e| LaminaError::TomlParse { path, source: e })
    }

    /// The launch-time view of this metadata
    pub fn to_launch(&self) -> launch::Metadata {
        launch::Metadata {
            processes: self.processes.clone(),
        }
    }
}

/// A subset of the application directory promoted to its own layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Slice {
    #[serde(default)]
    pub paths: Vec<String>,
}

/// A buildpack-provided image label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub key: String,
    pub value: String,
}

/// Provenance of the launcher binary baked into the image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LauncherMetadata {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub source: SourceMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(default)]
    pub git: GitMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitMetadata {
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub commit: String,
}

/// Project source provenance written as the project metadata label
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ProjectSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSource {
    #[serde(rename = "type", default)]
    pub source_type: String,
    #[serde(default)]
    pub version: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Cache-scoped analogue of [`LayersMetadata`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMetadata {
    #[serde(default)]
    pub buildpacks: Vec<BuildpackLayersMetadata>,
}

impl CacheMetadata {
    pub fn metadata_for_buildpack(&self, id: &str) -> BuildpackLayersMetadata {
        self.buildpacks
            .iter()
            .find(|bp| bp.id == id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Result of a successful export
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub build: BuildReport,
    pub image: ImageReport,
}

/// Concatenated bill of materials across the group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    #[serde(default)]
    pub bom: Vec<BomEntry>,
}

/// Identifiers of the saved image
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImageReport {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(rename = "imageID", skip_serializing_if = "String::is_empty")]
    pub image_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub digest: String,
    #[serde(rename = "manifestSize", skip_serializing_if = "is_zero")]
    pub manifest_size: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// One bill-of-materials entry, annotated with its owning buildpack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildpack: Option<BuildpackRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildpackRef {
    pub id: String,
    #[serde(default)]
    pub version: String,
}
