//! Environment source: CALLGATE__<SECTION>__<KEY>, e.g. CALLGATE__QUEUE__MAX_PENDING

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("CALLGATE")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    )
}
