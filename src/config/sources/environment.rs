//! Environment source: HASHER_<SECTION>__<KEY>, e.g. HASHER_DOWNLOAD__RETRY_COUNT=5

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("HASHER")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
