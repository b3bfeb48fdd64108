//! Index tuning configuration

use serde::{Deserialize, Serialize};

use crate::index::{IndexError, IndexResult};

/// Thresholds for adaptive identity containers and frozen extraction.
///
/// `array_max` and `set_min` differ so that a value hovering around one
/// size does not flip representation on every add/remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Small-array capacity; one more member promotes to a hash set
    #[serde(default = "default_array_max")]
    pub array_max: usize,

    /// A hash set smaller than this demotes to a small array
    #[serde(default = "default_set_min")]
    pub set_min: usize,

    /// Frozen values with more identities than this get their own sorted array
    #[serde(default = "default_frozen_extract_threshold")]
    pub frozen_extract_threshold: usize,
}

fn default_array_max() -> usize {
    20
}

fn default_set_min() -> usize {
    10
}

fn default_frozen_extract_threshold() -> usize {
    100
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            array_max: default_array_max(),
            set_min: default_set_min(),
            frozen_extract_threshold: default_frozen_extract_threshold(),
        }
    }
}

impl IndexConfig {
    /// Check threshold consistency
    pub fn validate(&self) -> IndexResult<()> {
        if self.array_max < 2 {
            return Err(IndexError::invalid_construction("array_max must be at least 2"));
        }
        if self.set_min == 0 {
            return Err(IndexError::invalid_construction("set_min must be at least 1"));
        }
        if self.set_min > self.array_max {
            return Err(IndexError::invalid_construction(format!(
                "set_min ({}) must not exceed array_max ({})",
                self.set_min, self.array_max
            )));
        }
        Ok(())
    }

    /// Parse from JSON, filling unset fields with defaults
    pub fn from_json(text: &str) -> IndexResult<Self> {
        let config: IndexConfig = serde_json::from_str(text)
            .map_err(|e| IndexError::invalid_construction(format!("bad config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = IndexConfig::default();
        assert_eq!(config.array_max, 20);
        assert_eq!(config.set_min, 10);
        assert_eq!(config.frozen_extract_threshold, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let config = IndexConfig {
            array_max: 4,
            set_min: 8,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config = IndexConfig::from_json(r#"{"frozen_extract_threshold": 3}"#).unwrap();
        assert_eq!(config.frozen_extract_threshold, 3);
        assert_eq!(config.array_max, 20);
        assert!(IndexConfig::from_json(r#"{"array_max": 1}"#).is_err());
    }
}
