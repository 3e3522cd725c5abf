//! Launch-time contract
//!
//! Paths and process metadata the launcher expects inside the exported
//! image. These are in-image POSIX paths, independent of the host OS.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Entrypoint binary that dispatches to process types
pub const LAUNCHER_PATH: &str = "/cnb/lifecycle/launcher";
/// Directory of per-process-type launcher symlinks
pub const PROCESS_DIR: &str = "/cnb/process";
/// Directory holding the lifecycle binaries
pub const LIFECYCLE_DIR: &str = "/cnb/lifecycle";

/// In-image entrypoint path for a named process type
pub fn process_path(process_type: &str) -> String {
    format!("{PROCESS_DIR}/{process_type}")
}

/// Render a buildpack id as an on-disk directory name
pub fn escape_id(id: &str) -> String {
    id.replace('/', "_")
}

/// Location of the build metadata document inside the layers dir
pub fn metadata_file_path(layers_dir: &Path) -> PathBuf {
    layers_dir.join("config").join("metadata.toml")
}

/// A named command contributed by a buildpack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    #[serde(rename = "type")]
    pub process_type: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub direct: bool,
    #[serde(
        default,
        rename(serialize = "buildpackID", deserialize = "buildpack-id"),
        skip_serializing_if = "String::is_empty"
    )]
    pub buildpack_id: String,
}

/// Launch metadata handed to the launcher and the process-types layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub processes: Vec<Process>,
}

impl Metadata {
    /// Look up a process by its type name
    pub fn find_process_type(&self, name: &str) -> Option<&Process> {
        self.processes.iter().find(|p| p.process_type == name)
    }

    /// The type names of all processes, in declaration order
    pub fn process_types(&self) -> Vec<String> {
        self.processes.iter().map(|p| p.process_type.clone()).collect()
    }
}
