//! Configuration for replay sessions

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{MimicError, Result};
use crate::sequence::SequenceMode;
use crate::transcript::DEFAULT_INDENT;

/// Largest accepted body indentation
pub const MAX_INDENT: usize = 8;

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MimicConfig {
    /// Behaviour once the expected calls run out
    pub mode: SequenceMode,

    /// Spaces before each record body line in rendered transcripts
    pub indent: usize,

    /// Write the `<Test Inputs>` preamble when rendering
    pub emit_test_inputs: bool,
}

impl Default for MimicConfig {
    fn default() -> Self {
        Self {
            mode: SequenceMode::Replay,
            indent: DEFAULT_INDENT,
            emit_test_inputs: true,
        }
    }
}

impl MimicConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `mimic.toml` in the working directory
    /// 3. The file named by `MIMIC_CONFIG_PATH`
    /// 4. `MIMIC_` environment variables (`MIMIC_MODE=record`, `MIMIC_INDENT=4`)
    ///
    /// # Errors
    ///
    /// Returns an error if a file is invalid or a value fails validation.
    pub fn load() -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(MimicConfig::default()))
            .merge(Toml::file("mimic.toml"));

        if let Ok(path) = std::env::var("MIMIC_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let figment = figment.merge(Env::prefixed("MIMIC_").ignore(&["config_path"]));

        Self::extract(figment, "Failed to load configuration")
    }

    /// Load configuration from a specific TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(MimicConfig::default()))
            .merge(Toml::file(path.as_ref()));

        if !path.as_ref().exists() {
            return Err(MimicError::Configuration(format!(
                "Configuration file not found: {}",
                path.as_ref().display()
            )));
        }

        Self::extract(figment, "Failed to load configuration file")
    }

    fn extract(figment: Figment, context: &str) -> Result<Self> {
        let config: MimicConfig = figment
            .extract()
            .map_err(|e| MimicError::Configuration(format!("{}: {}", context, e)))?;

        config.validate()?;
        tracing::debug!(
            mode = ?config.mode,
            indent = config.indent,
            emit_test_inputs = config.emit_test_inputs,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the indent is outside `1..=MAX_INDENT`.
    pub fn validate(&self) -> Result<()> {
        if self.indent == 0 || self.indent > MAX_INDENT {
            return Err(MimicError::Configuration(format!(
                "indent must be between 1 and {}, got {}",
                MAX_INDENT, self.indent
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = MimicConfig::default();
        assert_eq!(config.mode, SequenceMode::Replay);
        assert_eq!(config.indent, 2);
        assert!(config.emit_test_inputs);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let file = toml_file("mode = \"record\"\nindent = 4\n");
        let config = MimicConfig::from_file(file.path()).unwrap();

        assert_eq!(config.mode, SequenceMode::Record);
        assert_eq!(config.indent, 4);
        assert!(config.emit_test_inputs);
    }

    #[test]
    fn test_from_file_rejects_bad_indent() {
        let file = toml_file("indent = 0\n");
        let err = MimicConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, MimicError::Configuration(ref msg) if msg.contains("indent")));

        let file = toml_file("indent = 12\n");
        assert!(MimicConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_from_file_rejects_unknown_mode() {
        let file = toml_file("mode = \"rewind\"\n");
        let err = MimicConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration file"));
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = MimicConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
