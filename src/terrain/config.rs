//! Serializable build settings for a terrain quadtree

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::lod::LodSettings;
use crate::core::{Error, Result};

/// Everything the builder needs besides the height samples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Root page name; child names are derived from it
    pub name: String,
    /// Largest tile side, in samples
    pub block_size: u32,
    /// World units per grid step along x, per height unit along y, per step along z
    pub step_scale: [f32; 3],
    pub lod: LodSettings,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            name: "terrain".to_string(),
            block_size: 33,
            step_scale: [1.0, 1.0, 1.0],
            lod: LodSettings::default(),
        }
    }
}

impl TerrainConfig {
    pub fn new(name: impl Into<String>, block_size: u32, step_scale: Vec3) -> Self {
        Self {
            name: name.into(),
            block_size,
            step_scale: step_scale.to_array(),
            ..Default::default()
        }
    }

    /// Turn on collapse-record precomputation.
    pub fn with_lod(mut self, lod: LodSettings) -> Self {
        self.lod = lod;
        self
    }

    pub fn step_scale(&self) -> Vec3 {
        Vec3::from_array(self.step_scale)
    }

    /// Check the settings that do not depend on the height field.
    ///
    /// Horizontal steps must be positive so queries can divide by them; the
    /// vertical scale only has to be finite.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::InvalidBlockSize(self.block_size));
        }
        let step = self.step_scale();
        let horizontal_ok = |v: f32| v.is_finite() && v > 0.0;
        if !horizontal_ok(step.x) || !horizontal_ok(step.z) || !step.y.is_finite() {
            return Err(Error::InvalidStepScale(step));
        }
        Ok(())
    }

    /// Save as pretty JSON, creating parent directories.
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON. Missing fields take their defaults.
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = TerrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.step_scale(), Vec3::ONE);
        assert!(!config.lod.enabled);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_block = TerrainConfig::new("t", 0, Vec3::ONE);
        assert!(matches!(zero_block.validate(), Err(Error::InvalidBlockSize(0))));

        for step in [
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, -2.0),
            Vec3::new(f32::NAN, 1.0, 1.0),
            Vec3::new(1.0, f32::INFINITY, 1.0),
        ] {
            let config = TerrainConfig::new("t", 3, step);
            assert!(matches!(config.validate(), Err(Error::InvalidStepScale(_))), "{:?}", step);
        }

        // Flattened or inverted heights are allowed
        assert!(TerrainConfig::new("t", 3, Vec3::new(1.0, 0.0, 1.0)).validate().is_ok());
        assert!(TerrainConfig::new("t", 3, Vec3::new(1.0, -1.0, 1.0)).validate().is_ok());
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("terrain.json");

        let config = TerrainConfig::new("island", 17, Vec3::new(2.0, 0.5, 2.0)).with_lod(LodSettings {
            enabled: true,
            tris_per_pixel: 0.25,
        });
        config.save_sync(&path).unwrap();

        let loaded = TerrainConfig::load_sync(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "block_size": 9 }"#).unwrap();

        let loaded = TerrainConfig::load_sync(&path).unwrap();
        assert_eq!(loaded.block_size, 9);
        assert_eq!(loaded.name, "terrain");
        assert_eq!(loaded.lod, LodSettings::default());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = TerrainConfig::load_sync(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(Error::Io(_))));

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "not json").unwrap();
        assert!(matches!(TerrainConfig::load_sync(&garbage), Err(Error::Config(_))));

        let invalid = dir.path().join("invalid.json");
        std::fs::write(&invalid, r#"{ "block_size": 0 }"#).unwrap();
        assert!(matches!(TerrainConfig::load_sync(&invalid), Err(Error::InvalidBlockSize(0))));
    }
}
