//! Defaults for every config section, applied beneath all file and env layers.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Struct-level serde defaults cover every other field; these keys are set
/// here so that partially specified sections in files still merge cleanly.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("storage.backend", "sled")?
        .set_default("storage.path", ".driftbottle/store")?
        .set_default("queue.name", "bottle-retrigger")?
        .set_default("server.bind", "127.0.0.1:7071")
}
