/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use elan_data::app_config::{validate_template, Config, LogLevel, CONFIG_FILE_NAME};
use log::LevelFilter;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.export.filter.is_empty());
    assert!(config.export.text_template.is_none());
    assert!(!config.output.overwrite);
    assert!(config.output.output_dir.is_none());
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() -> Result<()> {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    // Blank tier names in the filter
    config.export.filter = vec!["Noise".to_string(), " ".to_string()];
    assert!(config.validate().is_err());
    config.export.filter = vec!["Noise".to_string()];

    // Unknown template placeholder
    config.export.text_template = Some("{tier}: {speaker}".to_string());
    assert!(config.validate().is_err());
    config.export.text_template = Some("{tier}: {text}".to_string());
    assert!(config.validate().is_ok());

    // Output directory that is a file
    let temp_dir = common::create_temp_dir()?;
    let file = common::create_test_file(temp_dir.path(), "not_a_dir", "")?;
    config.output.output_dir = Some(file);
    assert!(config.validate().is_err());

    Ok(())
}

/// Test that every documented placeholder is accepted
#[test]
fn test_validate_template_withAllPlaceholders_shouldPass() {
    assert!(validate_template("{tier} {start} {end} {duration} {id} {text}").is_ok());
    assert!(validate_template("plain text without placeholders").is_ok());
}

/// Test saving and loading a configuration file
#[test]
fn test_save_and_load_withCustomValues_shouldRoundTrip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested").join(CONFIG_FILE_NAME);

    let mut config = Config::default();
    config.log_level = LogLevel::Debug;
    config.export.filter = vec!["Noise".to_string()];
    config.output.overwrite = true;

    config.save(&path)?;
    let loaded = Config::load(&path)?;

    assert_eq!(loaded, config);
    Ok(())
}

/// Test that a missing config file is created with defaults
#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join(CONFIG_FILE_NAME);

    let config = Config::load_or_create(&path)?;

    assert_eq!(config, Config::default());
    assert!(path.exists());
    assert_eq!(Config::load(&path)?, config);
    Ok(())
}

/// Test that a broken config file is reported
#[test]
fn test_load_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), CONFIG_FILE_NAME, "{ not json")?;

    let error = Config::load(&path).unwrap_err();
    assert!(error.to_string().contains("Failed to parse config file"));
    Ok(())
}

/// Test log level names and filters
#[test]
fn test_log_level_withLowercaseJson_shouldMapToFilter() -> Result<()> {
    let config: Config = serde_json::from_str(r#"{"log_level": "trace"}"#)?;
    assert_eq!(config.log_level, LogLevel::Trace);
    assert_eq!(config.log_level.to_level_filter(), LevelFilter::Trace);
    assert_eq!(LogLevel::Error.to_level_filter(), LevelFilter::Error);

    let json = serde_json::to_string(&Config::default())?;
    assert!(json.contains(r#""log_level":"info""#));

    Ok(())
}

/// Test that the default location always names the config file
#[test]
fn test_default_path_shouldEndWithConfigFileName() {
    assert!(Config::default_path().ends_with(CONFIG_FILE_NAME));
}
