//! Public loading entry points; composes merge policy and sources.

use super::merge;
use super::sources::{environment, global_file, workspace_file};
use super::HasherConfig;
use config::{ConfigError, File};
use std::path::Path;
use tracing::debug;

/// Loads `HasherConfig` from the layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, global file, workspace files, then environment.
    pub fn load(workspace_root: &Path) -> Result<HasherConfig, ConfigError> {
        let global = global_file::global_config_path();
        Self::load_layers(workspace_root, global.as_deref())
    }

    /// `load` with an explicit global file location (or none).
    pub fn load_layers(
        workspace_root: &Path,
        global_path: Option<&Path>,
    ) -> Result<HasherConfig, ConfigError> {
        let builder = merge::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder, global_path);
        let builder = workspace_file::add_to_builder(builder, workspace_root);
        let builder = environment::add_to_builder(builder);
        let config: HasherConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Defaults, then exactly `path` (which must exist), then environment.
    pub fn load_from_file(path: &Path) -> Result<HasherConfig, ConfigError> {
        let builder = merge::builder_with_defaults()?.add_source(File::from(path).required(true));
        let builder = environment::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    /// Built-in defaults only.
    pub fn default() -> HasherConfig {
        HasherConfig::default()
    }
}
