//! Entrypoint selection
//!
//! Picks the image entrypoint from the platform API version, the
//! caller's default process type, and the buildpack-declared default.

use crate::api::Version;
use crate::error::{LaminaError, LaminaResult};
use crate::export::Exporter;
use crate::launch;
use tracing::{info, warn};

impl Exporter {
    pub(crate) fn entrypoint(
        &self,
        launch_md: &launch::Metadata,
        user_default: Option<&str>,
        buildpack_default: &str,
    ) -> LaminaResult<String> {
        if !self.supports_multicall_launcher() {
            return Ok(launch::LAUNCHER_PATH.to_string());
        }

        if user_default.is_none()
            && self.platform_api.less_than(Version::new(0, 6))
            && launch_md.processes.len() == 1
        {
            // a single process is the implicit default below 0.6
            let only = &launch_md.processes[0].process_type;
            info!("Setting default process type '{only}'");
            return Ok(launch::process_path(only));
        }

        if let Some(requested) = user_default {
            return match launch_md.find_process_type(requested) {
                Some(process) => {
                    info!("Setting default process type '{}'", process.process_type);
                    Ok(launch::process_path(&process.process_type))
                }
                None if self.platform_api.less_than(Version::new(0, 6)) => {
                    warn!(
                        "default process type '{requested}' not present in list [{}]",
                        launch_md.process_types().join(", ")
                    );
                    Ok(launch::LAUNCHER_PATH.to_string())
                }
                None => Err(LaminaError::DefaultProcessNotFound {
                    requested: requested.to_string(),
                }),
            };
        }

        if buildpack_default.is_empty() {
            info!("no default process type");
            return Ok(launch::LAUNCHER_PATH.to_string());
        }
        info!("Setting default process type '{buildpack_default}'");
        Ok(launch::process_path(buildpack_default))
    }
}
