//! Configuration for the hierarchy manager and the value generator.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BigCorpError, BigCorpResult, ValidationError};
use crate::validate::DEFAULT_MAX_NAME_LENGTH;

/// Settings of the hierarchy manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Longest accepted site or captor name, in characters.
    pub max_name_length: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl HierarchyConfig {
    /// Rejects settings the manager cannot work with.
    ///
    /// # Errors
    /// `InvalidConfig` if `max_name_length` is zero.
    pub fn validate(self) -> BigCorpResult<Self> {
        if self.max_name_length == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "max_name_length must be at least 1".to_string(),
            }
            .into());
        }
        Ok(self)
    }

    /// Parses and validates a JSON document. Missing keys take their default.
    ///
    /// # Errors
    /// `InvalidConfig` on malformed JSON or invalid values.
    pub fn from_json_str(json: &str) -> BigCorpResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()
    }

    /// Reads and validates a JSON configuration file.
    ///
    /// # Errors
    /// `Internal` if the file cannot be read, otherwise as [`HierarchyConfig::from_json_str`].
    pub fn from_file(path: impl AsRef<Path>) -> BigCorpResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            BigCorpError::internal(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }
}

/// Settings of the simulated value generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Fixed seed for reproducible readings; `None` seeds from the OS.
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = HierarchyConfig::default().validate().unwrap();
        assert_eq!(config.max_name_length, DEFAULT_MAX_NAME_LENGTH);
    }

    #[test]
    fn test_zero_name_length_rejected() {
        let err = HierarchyConfig { max_name_length: 0 }.validate().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = HierarchyConfig::from_json_str("{}").unwrap();
        assert_eq!(config, HierarchyConfig::default());

        let config = HierarchyConfig::from_json_str(r#"{"max_name_length": 16}"#).unwrap();
        assert_eq!(config.max_name_length, 16);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(HierarchyConfig::from_json_str("not json").unwrap_err().is_validation());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_name_length": 32}}"#).unwrap();
        let config = HierarchyConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_name_length, 32);
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = HierarchyConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_generator_config_json() {
        let config: GeneratorConfig = serde_json::from_str(r#"{"seed": 7}"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(GeneratorConfig::default().seed, None);
    }
}
