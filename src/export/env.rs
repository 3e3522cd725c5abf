//! Launch environment
//!
//! Stamps the CNB environment variables on the image. Multicall-capable
//! platforms get the process and lifecycle directories prepended to
//! PATH; older platforms export the default process type directly.

use crate::error::{LaminaError, LaminaResult};
use crate::export::Exporter;
use crate::image::Image;
use crate::launch;
use std::path::Path;
use tracing::debug;

/// Environment variables stamped on every exported image
pub mod vars {
    pub const LAYERS_DIR: &str = "CNB_LAYERS_DIR";
    pub const APP_DIR: &str = "CNB_APP_DIR";
    pub const PLATFORM_API: &str = "CNB_PLATFORM_API";
    pub const DEPRECATION_MODE: &str = "CNB_DEPRECATION_MODE";
    pub const PROCESS_TYPE: &str = "CNB_PROCESS_TYPE";

    pub const DEPRECATION_MODE_QUIET: &str = "quiet";
}

const PATH_LIST_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

impl Exporter {
    pub(crate) async fn set_env(
        &self,
        image: &mut dyn Image,
        layers_dir: &Path,
        app_dir: &Path,
        default_process_type: Option<&str>,
        launch_md: &launch::Metadata,
    ) -> LaminaResult<()> {
        let pairs = [
            (vars::LAYERS_DIR, layers_dir.to_string_lossy().into_owned()),
            (vars::APP_DIR, app_dir.to_string_lossy().into_owned()),
            (vars::PLATFORM_API, self.platform_api.to_string()),
            (
                vars::DEPRECATION_MODE,
                vars::DEPRECATION_MODE_QUIET.to_string(),
            ),
        ];
        for (key, value) in pairs {
            debug!("Setting {key}={value}");
            image
                .set_env(key, &value)
                .await
                .map_err(|e| LaminaError::context(format!("set app image env {key}"), e))?;
        }

        if self.supports_multicall_launcher() {
            let path = image
                .env("PATH")
                .await
                .map_err(|e| LaminaError::context("failed to get PATH from app image", e))?
                .unwrap_or_default();
            let sep = PATH_LIST_SEPARATOR.to_string();
            let path = [launch::PROCESS_DIR, launch::LIFECYCLE_DIR, &path].join(&sep);
            debug!(
                "Prepending {} and {} to PATH",
                launch::PROCESS_DIR,
                launch::LIFECYCLE_DIR
            );
            image
                .set_env("PATH", &path)
                .await
                .map_err(|e| LaminaError::context("set app image env PATH", e))?;
        } else if let Some(requested) = default_process_type {
            if launch_md.find_process_type(requested).is_none() {
                return Err(LaminaError::ProcessTypeMissing {
                    requested: requested.to_string(),
                    available: launch_md.process_types(),
                });
            }
            debug!("Setting {}={requested}", vars::PROCESS_TYPE);
            image
                .set_env(vars::PROCESS_TYPE, requested)
                .await
                .map_err(|e| {
                    LaminaError::context(format!("set app image env {}", vars::PROCESS_TYPE), e)
                })?;
        }
        Ok(())
    }
}
