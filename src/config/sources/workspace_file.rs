//! Workspace config file source: hasher.toml and hasher.{env}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use std::path::Path;

pub const WORKSPACE_CONFIG_FILE: &str = "hasher.toml";

/// Add workspace config files to builder.
/// Precedence: hasher.toml (base) then hasher.{HASHER_ENV}.toml when HASHER_ENV is set.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> ConfigBuilder<DefaultState> {
    let mut builder = builder;

    let base_config_path = workspace_root.join(WORKSPACE_CONFIG_FILE);
    if base_config_path.exists() {
        builder = builder.add_source(File::from(base_config_path.as_path()).required(false));
    }

    if let Ok(env_name) = std::env::var("HASHER_ENV") {
        let env_config_path = workspace_root.join(format!("hasher.{}.toml", env_name));
        if env_config_path.exists() {
            builder = builder.add_source(File::from(env_config_path.as_path()).required(false));
        }
    }

    builder
}
