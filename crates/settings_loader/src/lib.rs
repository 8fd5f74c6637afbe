//! # Settings Loader
//!
//! Loads the advisor configuration from a JSON file (`settings.json` by default).
//! Every key is optional; anything left out keeps its built-in default, so an
//! empty object `{}` is a valid settings file.
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! // Load settings from a specific path
//! let settings = settings_loader::load_settings("config/advisor.json")?;
//!
//! // Use the file if it is there, built-in defaults otherwise
//! let path = Some(PathBuf::from("settings.json"));
//! let settings = settings_loader::load_settings_with_fallback(path.as_ref())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use models::AdvisorSettings;

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Loads settings from a JSON file and checks them for consistency.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<AdvisorSettings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: AdvisorSettings = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    validate(&settings).with_context(|| format!("Invalid settings in {}", path.display()))?;
    Ok(settings)
}

/// Uses the given path when provided, otherwise `settings.json` in the current directory.
///
/// A missing file falls back to defaults. A file that exists but is malformed is an error:
/// silently ignoring it would run with guidelines the user did not ask for.
pub fn load_settings_with_fallback(path: Option<&PathBuf>) -> Result<AdvisorSettings> {
    let candidate = path
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

    if !candidate.exists() {
        if path.is_some() {
            return Err(anyhow!("Settings file not found: {}", candidate.display()));
        }
        tracing::debug!("No {} found, using built-in settings", DEFAULT_SETTINGS_FILE);
        return Ok(AdvisorSettings::default());
    }

    tracing::info!("Loading settings from {}", candidate.display());
    load_settings(&candidate)
}

fn validate(settings: &AdvisorSettings) -> Result<()> {
    settings.column_layout()?;
    if settings.guidelines.iter().all(|g| g.trim().is_empty()) {
        return Err(anyhow!("'guidelines' must contain at least one non-empty clause"));
    }
    if settings.default_model.trim().is_empty() {
        return Err(anyhow!("'default_model' must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::Field;
    use std::io::Write;

    fn write_settings(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_settings_overrides_only_given_keys() {
        let file = write_settings(r#"{ "default_model": "llama3.2", "guidelines": ["Be brief."] }"#);
        let settings = load_settings(file.path()).unwrap();

        assert_eq!(settings.default_model, "llama3.2");
        assert_eq!(settings.guidelines, vec!["Be brief.".to_string()]);
        assert_eq!(settings.columns, Field::ALL.to_vec());
    }

    #[test]
    fn test_load_settings_rejects_empty_guidelines() {
        let file = write_settings(r#"{ "guidelines": [] }"#);
        let err = load_settings(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("guidelines"));
    }

    #[test]
    fn test_load_settings_rejects_layout_without_payment() {
        let file = write_settings(r#"{ "columns": ["description", "type"] }"#);
        let err = load_settings(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("monthly_payment"));
    }

    #[test]
    fn test_load_settings_rejects_malformed_json() {
        let file = write_settings("{ not json");
        assert!(load_settings(file.path()).is_err());
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let path = PathBuf::from("/definitely/not/here/settings.json");
        assert!(load_settings_with_fallback(Some(&path)).is_err());
    }
}
