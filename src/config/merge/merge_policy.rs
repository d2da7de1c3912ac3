//! Merge rules: defaults first, every later source overrides key by key.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("storage.path", ".sweep/db")?
        .set_default("cleanup.batch_size", 40_i64)?
        .set_default("cleanup.lease_ttl_secs", 120_i64)?
        .set_default("server.bind", "127.0.0.1:8787")?
        .set_default("client.timeout_secs", 30_i64)
}
