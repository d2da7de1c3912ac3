//! Integration tests for Configuration System

use sweep::auth::hash_token;
use sweep::cli::{Commands, RunContext};
use sweep::config::{ConfigLoader, SweepConfig};
use tempfile::TempDir;

use crate::integration::test_utils::with_xdg_env;

#[test]
fn test_config_file_drives_batch_size() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("sweep.toml");
    std::fs::write(
        &config_file,
        r#"
[cleanup]
batch_size = 10

[storage]
path = "data/store"
"#,
    )
    .unwrap();

    let ctx = RunContext::new(temp_dir.path().to_path_buf(), Some(config_file)).unwrap();
    assert_eq!(ctx.config().cleanup.batch_size, 10);

    ctx.execute(&Commands::Seed {
        products: 25,
        variations: 0,
        orders: 0,
        items: 0,
        held: 0,
    })
    .unwrap();
    assert!(temp_dir.path().join("data").join("store").exists());
}

#[test]
fn test_auth_tokens_load_and_validate() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("sweep.toml");
    std::fs::write(
        &config_file,
        format!(
            r#"
[[auth.tokens]]
name = "ops"
token_hash = "{}"
"#,
            hash_token("s3cret")
        ),
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.auth.tokens.len(), 1);
    assert_eq!(config.auth.tokens[0].name, "ops");
}

#[test]
fn test_short_token_hash_fails_validation() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("sweep.toml");
    std::fs::write(
        &config_file,
        r#"
[[auth.tokens]]
name = "ops"
token_hash = "abc"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().starts_with("auth:"));
}

#[test]
fn test_global_config_is_picked_up_from_xdg() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        let global = test_dir.path().join("xdg").join("sweep");
        std::fs::create_dir_all(&global).unwrap();
        std::fs::write(
            global.join("config.toml"),
            "[client]\nserver = \"http://cleanup.internal:8787\"\ntimeout_secs = 5\n",
        )
        .unwrap();

        let root = test_dir.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        let config = ConfigLoader::load(&root).unwrap();
        assert_eq!(
            config.client.server.as_deref(),
            Some("http://cleanup.internal:8787")
        );
        assert_eq!(config.client.timeout_secs, 5);
    });
}

#[test]
fn test_cli_flags_override_config_endpoint() {
    let test_dir = TempDir::new().unwrap();
    let mut config = SweepConfig::default();
    config.client.server = Some("http://from-config:1".to_string());
    config.client.token = Some("config-token".to_string());

    let ctx = RunContext::from_config(test_dir.path().to_path_buf(), config)
        .unwrap()
        .with_remote(Some("http://from-flag:2".to_string()), None);
    assert_eq!(ctx.config().client.server.as_deref(), Some("http://from-flag:2"));
    assert_eq!(ctx.config().client.token.as_deref(), Some("config-token"));
}
