//! Conversion options, loadable from TOML.
//!
//! ```toml
//! strategies = ["gltf", "glb"]
//!
//! [material]
//! diffuse_color = [0.7, 0.7, 0.7]
//! roughness = 0.5
//! metallic = 0.0
//!
//! [package]
//! alignment = "strict"   # or "none"
//! layer_name = "model.usda"
//! ```
//!
//! Every field is optional; missing ones take their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use arq_math::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::PreviewMaterial;
use crate::usdz::PackageOptions;

/// Errors from loading or validating options.
#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid options TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("At least one conversion strategy is required")]
    NoStrategies,

    #[error("{field} = {value} is outside [0, 1]")]
    OutOfRange { field: &'static str, value: f32 },

    #[error("Layer name {0:?} must be a file name ending in .usda")]
    InvalidLayerName(String),
}

/// Which GLB reader a conversion strategy uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Reader backed by the `gltf` crate
    Gltf,

    /// Built-in container reader
    Glb,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Gltf => "gltf",
            StrategyKind::Glb => "glb",
        }
    }
}

/// Constant inputs of the shared preview material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialOptions {
    /// RGB, 0-1
    pub diffuse_color: [f32; 3],
    pub roughness: f32,
    pub metallic: f32,
}

impl Default for MaterialOptions {
    fn default() -> Self {
        let material = PreviewMaterial::default();
        Self {
            diffuse_color: material.diffuse_color.to_array(),
            roughness: material.roughness,
            metallic: material.metallic,
        }
    }
}

impl MaterialOptions {
    pub fn to_material(&self) -> PreviewMaterial {
        PreviewMaterial {
            diffuse_color: Vec3::from_array(self.diffuse_color),
            roughness: self.roughness,
            metallic: self.metallic,
            ..Default::default()
        }
    }
}

/// All conversion options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Strategies to try, in order
    pub strategies: Vec<StrategyKind>,
    pub material: MaterialOptions,
    pub package: PackageOptions,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            strategies: vec![StrategyKind::Gltf, StrategyKind::Glb],
            material: MaterialOptions::default(),
            package: PackageOptions::default(),
        }
    }
}

impl ConvertOptions {
    /// Parse and validate options from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, OptionsError> {
        let options: Self = toml::from_str(content)?;
        options.validate()
    }

    /// Read, parse and validate an options file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| OptionsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let options = Self::from_toml_str(&content)?;
        log::info!("Loaded conversion options from {:?}", path);
        Ok(options)
    }

    /// Check ranges and names; drops repeated strategies, keeping the first.
    pub fn validate(mut self) -> Result<Self, OptionsError> {
        let mut seen = Vec::with_capacity(self.strategies.len());
        self.strategies.retain(|kind| {
            if seen.contains(kind) {
                log::warn!("Strategy {} listed twice, ignoring the repeat", kind.name());
                false
            } else {
                seen.push(*kind);
                true
            }
        });
        if self.strategies.is_empty() {
            return Err(OptionsError::NoStrategies);
        }

        let material = &self.material;
        let [r, g, b] = material.diffuse_color;
        for (field, value) in [
            ("material.diffuse_color[0]", r),
            ("material.diffuse_color[1]", g),
            ("material.diffuse_color[2]", b),
            ("material.roughness", material.roughness),
            ("material.metallic", material.metallic),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(OptionsError::OutOfRange { field, value });
            }
        }

        let layer_name = &self.package.layer_name;
        if !layer_name.ends_with(".usda") || layer_name.contains(['/', '\\']) {
            return Err(OptionsError::InvalidLayerName(layer_name.clone()));
        }

        Ok(self)
    }
}
