//! Runtime configuration for segment indexes
//!
//! Configuration is plain TOML, every key optional:
//!
//! ```toml
//! verify_checksums = true
//! cancel_poll_interval = 1
//!
//! [sections]
//! segments = "ftseg.segments"
//! offsets = "ftseg.offsets"
//! bits = "ftseg.bits"
//! nodes = "ftseg.nodes"
//! features_offsets = "features_offsets"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Section names used inside a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionNames {
    pub segments: String,
    pub offsets: String,
    pub bits: String,
    pub nodes: String,
    pub features_offsets: String,
}

impl Default for SectionNames {
    fn default() -> Self {
        Self {
            segments: "ftseg.segments".to_string(),
            offsets: "ftseg.offsets".to_string(),
            bits: "ftseg.bits".to_string(),
            nodes: "ftseg.nodes".to_string(),
            features_offsets: "features_offsets".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmapConfig {
    /// Verify CRC-64 footers when attaching sections
    pub verify_checksums: bool,
    /// Number of forward entries scanned between two cancel-flag polls
    pub cancel_poll_interval: usize,
    pub sections: SectionNames,
}

impl Default for SegmapConfig {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            cancel_poll_interval: 1,
            sections: SectionNames::default(),
        }
    }
}

impl SegmapConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SegmapConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        let names = [
            &self.sections.segments,
            &self.sections.offsets,
            &self.sections.bits,
            &self.sections.nodes,
            &self.sections.features_offsets,
        ];
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(Error::Config("section names must not be empty".to_string()));
            }
            if names[..i].contains(name) {
                return Err(Error::Config(format!("duplicate section name '{name}'")));
            }
        }
        Ok(())
    }

    /// Poll interval, never zero
    pub fn poll_interval(&self) -> usize {
        self.cancel_poll_interval.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SegmapConfig::default();
        assert!(config.verify_checksums);
        assert_eq!(config.poll_interval(), 1);
        assert_eq!(config.sections.segments, "ftseg.segments");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SegmapConfig::from_toml_str(
            r#"
            cancel_poll_interval = 64

            [sections]
            nodes = "backward.nodes"
            "#,
        )
        .unwrap();
        assert_eq!(config.cancel_poll_interval, 64);
        assert!(config.verify_checksums);
        assert_eq!(config.sections.nodes, "backward.nodes");
        assert_eq!(config.sections.bits, "ftseg.bits");
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let config = SegmapConfig::from_toml_str("cancel_poll_interval = 0").unwrap();
        assert_eq!(config.poll_interval(), 1);
    }

    #[test]
    fn test_duplicate_section_names_rejected() {
        let err = SegmapConfig::from_toml_str(
            r#"
            [sections]
            bits = "same"
            nodes = "same"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = SegmapConfig::from_toml_str("verify_checksums = \"yes\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segmap.toml");
        std::fs::write(&path, "verify_checksums = false\n").unwrap();
        let config = SegmapConfig::from_file(&path).unwrap();
        assert!(!config.verify_checksums);
    }
}
