//! Build report aggregation
//!
//! Concatenates each buildpack's optional `build.toml` bill of materials
//! into the export report, annotating every entry with its owning
//! buildpack. Platforms below 0.5 (and buildpacks below API 0.5) predate
//! the report and are skipped.

use crate::api::Version;
use crate::error::{LaminaError, LaminaResult};
use crate::export::Exporter;
use crate::launch::escape_id;
use crate::metadata::{BomEntry, BuildReport, BuildpackRef};
use std::io::ErrorKind;
use std::path::Path;

impl Exporter {
    pub(crate) async fn build_report(&self, layers_dir: &Path) -> LaminaResult<BuildReport> {
        if self.platform_api.less_than(Version::new(0, 5)) {
            return Ok(BuildReport::default());
        }

        let mut bom = Vec::new();
        for bp in &self.buildpacks {
            if bp.api_version()?.less_than(Version::new(0, 5)) {
                continue;
            }

            let path = layers_dir.join(escape_id(&bp.id)).join("build.toml");
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(LaminaError::io(format!("reading {}", path.display()), e))
                }
            };
            let bp_report: BuildReport =
                toml::from_str(&content).map_err(|e| LaminaError::TomlParse { path, source: e })?;

            bom.extend(bp_report.bom.into_iter().map(|entry| BomEntry {
                buildpack: Some(BuildpackRef {
                    id: bp.id.clone(),
                    version: bp.version.clone(),
                }),
                ..entry
            }));
        }
        Ok(BuildReport { bom })
    }
}
