//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("session.connect_timeout_ms", 5_000_i64)?
        .set_default("session.location_timeout_ms", 10_000_i64)?
        .set_default("session.update_interval_ms", 60_000_i64)?
        .set_default("session.update_priority", "balanced")?
        .set_default("queue.max_pending", 10_000_i64)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
