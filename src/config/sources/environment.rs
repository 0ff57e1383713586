//! Environment source: BOTTLE__SECTION__KEY variables.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub const ENV_PREFIX: &str = "BOTTLE";
pub const ENV_SEPARATOR: &str = "__";

/// Variable the Azure Maps key is conventionally deployed under
pub const MAPS_KEY_VAR: &str = "MAPS_SUB_KEY";

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    )
}

/// Azure Maps key from `MAPS_SUB_KEY`, if set and non-empty.
pub fn maps_key_from_env() -> Option<String> {
    std::env::var(MAPS_KEY_VAR)
        .ok()
        .filter(|key| !key.trim().is_empty())
}
