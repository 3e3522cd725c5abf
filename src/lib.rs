//! Lamina - buildpack image export engine
//!
//! Assembles a runnable container image from the directory tree a build
//! phase leaves behind: adds or reuses layer tarballs by digest, stamps
//! the metadata labels, wires the launch environment and entrypoint, and
//! promotes a volume-backed layer cache with an atomic two-generation
//! swap.

pub mod api;
pub mod cache;
pub mod digest;
pub mod error;
pub mod export;
pub mod image;
pub mod launch;
pub mod layer;
pub mod metadata;

pub use error::{LaminaError, LaminaResult};
pub use export::{ExportOptions, Exporter, LauncherConfig};
