//! Hand-rolled collaborators for export scenarios

use async_trait::async_trait;
use lamina::digest;
use lamina::error::LaminaResult;
use lamina::image::Image;
use lamina::launch;
use lamina::layer::{Layer, LayerFactory};
use lamina::metadata::{ImageReport, Slice};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One image mutation in invocation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerCall {
    Add(String),
    Reuse(String),
}

/// In-memory image recording every mutation
#[derive(Default)]
pub struct FakeImage {
    pub top_layer_digest: String,
    pub env_vars: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub entrypoint: Option<String>,
    pub cmd: Option<Vec<String>>,
    pub working_dir: Option<String>,
    pub calls: Vec<LayerCall>,
    pub saved_names: Option<Vec<String>>,
    pub manifest_size: u64,
}

impl FakeImage {
    pub fn new(top_layer_digest: &str) -> Self {
        Self {
            top_layer_digest: top_layer_digest.to_string(),
            manifest_size: 1024,
            ..Default::default()
        }
    }

    pub fn added(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                LayerCall::Add(sha) => Some(sha.as_str()),
                LayerCall::Reuse(_) => None,
            })
            .collect()
    }

    pub fn reused(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                LayerCall::Reuse(sha) => Some(sha.as_str()),
                LayerCall::Add(_) => None,
            })
            .collect()
    }

    pub fn label_json(&self, key: &str) -> serde_json::Value {
        serde_json::from_str(self.labels.get(key).expect("label not set")).unwrap()
    }
}

#[async_trait]
impl Image for FakeImage {
    async fn top_layer(&self) -> LaminaResult<String> {
        Ok(self.top_layer_digest.clone())
    }

    async fn add_layer_with_diff_id(&mut self, _tar_path: &Path, diff_id: &str) -> LaminaResult<()> {
        self.calls.push(LayerCall::Add(diff_id.to_string()));
        Ok(())
    }

    async fn reuse_layer(&mut self, diff_id: &str) -> LaminaResult<()> {
        self.calls.push(LayerCall::Reuse(diff_id.to_string()));
        Ok(())
    }

    async fn set_label(&mut self, key: &str, value: &str) -> LaminaResult<()> {
        self.labels.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_env(&mut self, key: &str, value: &str) -> LaminaResult<()> {
        self.env_vars.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn env(&self, key: &str) -> LaminaResult<Option<String>> {
        Ok(self.env_vars.get(key).cloned())
    }

    async fn set_entrypoint(&mut self, entrypoint: &str) -> LaminaResult<()> {
        self.entrypoint = Some(entrypoint.to_string());
        Ok(())
    }

    async fn set_cmd(&mut self, cmd: &[String]) -> LaminaResult<()> {
        self.cmd = Some(cmd.to_vec());
        Ok(())
    }

    async fn set_working_dir(&mut self, dir: &str) -> LaminaResult<()> {
        self.working_dir = Some(dir.to_string());
        Ok(())
    }

    async fn save(&mut self, additional_names: &[String]) -> LaminaResult<ImageReport> {
        self.saved_names = Some(additional_names.to_vec());
        Ok(ImageReport {
            tags: additional_names.to_vec(),
            image_id: "fake-image-id".to_string(),
            digest: String::new(),
            manifest_size: self.manifest_size,
        })
    }
}

/// Layer factory producing content-addressed fake tarballs on disk
///
/// Digests are computed from the input contents, so identical inputs
/// yield identical digests across sessions.
pub struct FakeLayerFactory {
    tars_dir: PathBuf,
}

impl FakeLayerFactory {
    pub fn new(tars_dir: &Path) -> Self {
        std::fs::create_dir_all(tars_dir).unwrap();
        Self {
            tars_dir: tars_dir.to_path_buf(),
        }
    }

    fn write_tar(&self, id: &str, bytes: &[u8]) -> Layer {
        let tar_path = self
            .tars_dir
            .join(format!("{}.tar", id.replace(['/', ':'], "_")));
        std::fs::write(&tar_path, bytes).unwrap();
        Layer {
            id: id.to_string(),
            tar_path,
            digest: digest::for_bytes(bytes),
        }
    }
}

/// Deterministic byte rendering of a directory tree
fn dir_bytes(dir: &Path) -> Vec<u8> {
    fn walk(dir: &Path, root: &Path, buf: &mut Vec<u8>) {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        entries.sort();
        for path in entries {
            if path.is_dir() {
                walk(&path, root, buf);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                buf.extend_from_slice(rel.to_string_lossy().as_bytes());
                buf.push(0);
                buf.extend_from_slice(&std::fs::read(&path).unwrap());
            }
        }
    }

    let mut buf = Vec::new();
    walk(dir, dir, &mut buf);
    buf
}

#[async_trait]
impl LayerFactory for FakeLayerFactory {
    async fn dir_layer(&self, id: &str, dir: &Path) -> LaminaResult<Layer> {
        Ok(self.write_tar(id, &dir_bytes(dir)))
    }

    async fn launcher_layer(&self, path: &Path) -> LaminaResult<Layer> {
        let bytes = std::fs::read(path).unwrap();
        Ok(self.write_tar("launcher", &bytes))
    }

    async fn process_types_layer(&self, metadata: &launch::Metadata) -> LaminaResult<Layer> {
        let bytes = serde_json::to_vec(&metadata.processes).unwrap();
        Ok(self.write_tar("process-types", &bytes))
    }

    async fn slice_layers(&self, app_dir: &Path, slices: &[Slice]) -> LaminaResult<Vec<Layer>> {
        let mut layers = Vec::with_capacity(slices.len() + 1);
        for (i, slice) in slices.iter().enumerate() {
            let bytes = format!("slice:{}:{}", i, slice.paths.join(",")).into_bytes();
            layers.push(self.write_tar(&format!("slice-{}", i + 1), &bytes));
        }
        // the unsliced remainder is always last
        layers.push(self.write_tar("app", &dir_bytes(app_dir)));
        Ok(layers)
    }
}
