//! Entry point that assembles the configuration layers.

use super::merge::merge_policy;
use super::sources::{environment, global_file, root_file};
use super::SweepConfig;
use config::{ConfigError, File};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the global file, then `<root>/config/*.toml`, then `SWEEP__*`.
    pub fn load(root: &Path) -> Result<SweepConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = root_file::add_to_builder(builder, root)?;
        let builder = environment::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    /// Defaults plus exactly one file, for `--config`.
    pub fn load_from_file(path: &Path) -> Result<SweepConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        super::paths::global_config_path()
    }
}
