//! Config file loading tests

use medbotd::config::{Config, Mode};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_toml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_explicit_path() {
    let file = write_toml(
        r#"
[server]
port = 8080

[bot]
mode = "direct"
confidence_threshold = 0.3
"#,
    );
    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.bot.mode, Mode::Direct);
    assert_eq!(config.bot.confidence_threshold, 0.3);
    assert_eq!(config.llm.history_turns, 10);
}

#[test]
fn test_explicit_missing_file_is_error() {
    assert!(Config::load(Some(std::path::Path::new("/nonexistent/medbot.toml"))).is_err());
}

#[test]
fn test_invalid_threshold_rejected_on_load() {
    let file = write_toml("[bot]\nconfidence_threshold = -0.1\n");
    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("confidence_threshold"));
}

#[test]
fn test_unparseable_file_is_error() {
    let file = write_toml("[bot\nmode = ");
    assert!(Config::load(Some(file.path())).is_err());
}

#[test]
fn test_example_config_parses() {
    let config: Config = toml::from_str(include_str!("../../../medbot.example.toml")).unwrap();
    config.validate().unwrap();
    assert_eq!(config.bot.mode, Mode::Hybrid);
    assert_eq!(config.llm.api_key_env, "GROQ_API_KEY");
}
