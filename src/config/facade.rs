//! ConfigLoader: assembles the layered sources into a DriftConfig.

use super::merge::merge_policy::builder_with_defaults;
use super::sources::{environment, global_file, workspace_file};
use super::DriftConfig;
use crate::error::DriftError;
use config::File;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (highest last): defaults, user config file, workspace
    /// `config/config.toml`, `config/{BOTTLE_ENV}.toml`, `BOTTLE__*`
    /// variables, `MAPS_SUB_KEY`.
    pub fn load(workspace_root: &Path) -> Result<DriftConfig, DriftError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: DriftConfig = builder.build()?.try_deserialize()?;
        Ok(Self::apply_maps_key(config))
    }

    /// Load from one explicit file, still honoring environment overrides.
    pub fn load_from_file(path: &Path) -> Result<DriftConfig, DriftError> {
        if !path.exists() {
            return Err(DriftError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let builder = builder_with_defaults()?.add_source(File::from(path).required(true));
        let builder = environment::add_to_builder(builder);

        let config: DriftConfig = builder.build()?.try_deserialize()?;
        Ok(Self::apply_maps_key(config))
    }

    fn apply_maps_key(mut config: DriftConfig) -> DriftConfig {
        if let Some(key) = environment::maps_key_from_env() {
            config.maps.subscription_key = Some(key);
        }
        config
    }
}
