//! Buildpack layer directory reading and classification
//!
//! Each buildpack in the group owns `<layersDir>/<escapedId>/`, holding a
//! `<name>.toml` metadata file per logical layer, the matching `<name>/`
//! contents directory, and the optional `store.toml` / `build.toml`
//! documents. Buildpack API 0.6 moved the layer flags into a `[types]`
//! table; both shapes parse.

use crate::error::{LaminaError, LaminaResult};
use crate::launch::escape_id;
use crate::metadata::{BuildpackLayerMetadata, BuildpackStore, GroupBuildpack};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Files in a buildpack dir that do not name a layer
const RESERVED: &[&str] = &["store.toml", "build.toml", "launch.toml"];

/// One buildpack's layer directory, read and classified
#[derive(Debug)]
pub struct BuildpackLayersDir {
    pub path: PathBuf,
    pub layers: Vec<BuildpackLayer>,
    pub store: Option<BuildpackStore>,
}

impl BuildpackLayersDir {
    /// Read `<layersDir>/<escapedId>/` for one group buildpack
    pub async fn read(layers_dir: &Path, bp: &GroupBuildpack) -> LaminaResult<Self> {
        let path = layers_dir.join(escape_id(&bp.id));

        let read_err = |e| LaminaError::BuildpackDir {
            id: bp.id.clone(),
            source: e,
        };
        let mut entries = tokio::fs::read_dir(&path).await.map_err(read_err)?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if RESERVED.contains(&file_name) {
                continue;
            }
            if let Some(stem) = file_name.strip_suffix(".toml") {
                names.push(stem.to_string());
            }
        }
        names.sort();

        let mut layers = Vec::with_capacity(names.len());
        for name in names {
            layers.push(BuildpackLayer::read(&bp.id, &path, name).await);
        }
        debug!("Found {} layer(s) for buildpack '{}'", layers.len(), bp.id);

        let store = read_store(&path).await?;

        Ok(Self {
            path,
            layers,
            store,
        })
    }

    /// Layers participating in the runtime image
    pub fn launch_layers(&self) -> impl Iterator<Item = &BuildpackLayer> {
        self.layers.iter().filter(|l| l.for_launch())
    }

    /// Layers preserved across builds via the volume cache
    pub fn cache_layers(&self) -> impl Iterator<Item = &BuildpackLayer> {
        self.layers.iter().filter(|l| l.for_cache())
    }

    /// Sorted identifiers of layers whose metadata failed to parse
    pub fn malformed_layers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .layers
            .iter()
            .filter(|l| l.is_malformed())
            .map(|l| l.identifier())
            .collect();
        ids.sort();
        ids
    }
}

/// A logical layer named by its `<name>.toml` metadata file
#[derive(Debug)]
pub struct BuildpackLayer {
    pub buildpack_id: String,
    pub name: String,
    /// Contents directory; may not exist for reuse-only layers
    pub path: PathBuf,
    /// `None` when the metadata file failed to parse
    pub metadata: Option<BuildpackLayerMetadata>,
}

impl BuildpackLayer {
    async fn read(buildpack_id: &str, bp_dir: &Path, name: String) -> Self {
        let toml_path = bp_dir.join(format!("{name}.toml"));
        let metadata = match tokio::fs::read_to_string(&toml_path).await {
            Ok(content) => parse_layer_metadata(&content).ok(),
            Err(_) => None,
        };

        Self {
            buildpack_id: buildpack_id.to_string(),
            path: bp_dir.join(&name),
            name,
            metadata,
        }
    }

    /// `<buildpackId>:<layerName>`
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.buildpack_id, self.name)
    }

    /// Whether the contents directory exists on disk
    pub fn has_local_contents(&self) -> bool {
        self.path.is_dir()
    }

    pub fn for_launch(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.launch)
    }

    pub fn for_cache(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.cache)
    }

    pub fn is_malformed(&self) -> bool {
        self.metadata.is_none()
    }
}

/// Layer metadata file shape: flat flags, or nested under `[types]` for
/// buildpack API 0.6 and later
#[derive(serde::Deserialize)]
struct LayerMetadataFile {
    types: Option<LayerTypes>,
    #[serde(default)]
    launch: bool,
    #[serde(default)]
    build: bool,
    #[serde(default)]
    cache: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    sha: String,
}

#[derive(serde::Deserialize)]
struct LayerTypes {
    #[serde(default)]
    launch: bool,
    #[serde(default)]
    build: bool,
    #[serde(default)]
    cache: bool,
}

fn parse_layer_metadata(content: &str) -> Result<BuildpackLayerMetadata, toml::de::Error> {
    let file: LayerMetadataFile = toml::from_str(content)?;
    let (launch, build, cache) = match file.types {
        Some(t) => (t.launch, t.build, t.cache),
        None => (file.launch, file.build, file.cache),
    };
    Ok(BuildpackLayerMetadata {
        sha: file.sha,
        data: file.data,
        build,
        launch,
        cache,
    })
}

async fn read_store(bp_dir: &Path) -> LaminaResult<Option<BuildpackStore>> {
    let path = bp_dir.join("store.toml");
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(LaminaError::io(format!("reading {}", path.display()), e)),
    };
    let store = toml::from_str(&content).map_err(|e| LaminaError::TomlParse { path, source: e })?;
    Ok(Some(store))
}
