//! Content digest rendering and production
//!
//! Layer tarballs are identified by a canonical `sha256:<hex>` digest.
//! On disk a digest becomes `<digest>.tar`; Windows hosts strip the
//! `sha256:` prefix to avoid the illegal colon in file names.

use crate::error::{LaminaError, LaminaResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const SHA256_PREFIX: &str = "sha256:";

/// Render a digest as a tarball file name
pub fn tar_file_name(diff_id: &str) -> String {
    let rendered = if cfg!(windows) {
        diff_id.strip_prefix(SHA256_PREFIX).unwrap_or(diff_id)
    } else {
        diff_id
    };
    format!("{rendered}.tar")
}

/// Path of the tarball for a digest under a cache generation directory
pub fn tar_path(base: &Path, diff_id: &str) -> PathBuf {
    base.join(tar_file_name(diff_id))
}

/// Canonical digest of a byte slice
pub fn for_bytes(data: &[u8]) -> String {
    format!("{}{}", SHA256_PREFIX, hex::encode(Sha256::digest(data)))
}

/// Canonical digest of a file's contents
pub async fn for_file(path: &Path) -> LaminaResult<String> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| LaminaError::io(format!("reading {}", path.display()), e))?;
    Ok(for_bytes(&data))
}
