//! Merge rules: defaults first, later sources override earlier ones key by key.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("hashing.buffer_size", crate::tree::hasher::DEFAULT_BUFFER_SIZE as u64)?
        .set_default("copy.compression_level", crate::compression::DEFAULT_LEVEL as u64)?
        .set_default("logging.output", "stderr")
}
