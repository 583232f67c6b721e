use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    assets::store::{VolumeAsset, VolumeAssetStore},
    foundation::error::{NanoVolumeError, NanoVolumeResult},
    render::opts::{RenderOpts, SceneView},
};

/// One asset entry of a manifest. Omitted parameters take the `VolumeAsset` defaults.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetSpec {
    pub path: String,
    #[serde(default)]
    pub density: Option<f32>,
    #[serde(default)]
    pub light_step_samples: Option<u32>,
    #[serde(default)]
    pub noise_strength: Option<f32>,
    #[serde(default)]
    pub gt_density: Option<f32>,
    #[serde(default)]
    pub gt_light_step_samples: Option<u32>,
    #[serde(default)]
    pub gt_light_ray_length: Option<f32>,
}

impl AssetSpec {
    fn to_asset(&self, base: &Path) -> VolumeAsset {
        let path = Path::new(&self.path);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        };
        let mut asset = VolumeAsset::new(resolved.to_string_lossy().into_owned());
        if let Some(v) = self.density {
            asset.density = v;
        }
        if let Some(v) = self.light_step_samples {
            asset.light_step_samples = v;
        }
        if let Some(v) = self.noise_strength {
            asset.noise_strength = v;
        }
        if let Some(v) = self.gt_density {
            asset.gt_density = v;
        }
        if let Some(v) = self.gt_light_step_samples {
            asset.gt_light_step_samples = v;
        }
        if let Some(v) = self.gt_light_ray_length {
            asset.gt_light_ray_length = v;
        }
        asset
    }
}

/// JSON session description: the volumes to load plus render and scene settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeManifest {
    /// Scene label used in capture file names.
    #[serde(default = "default_scene")]
    pub scene: String,
    pub assets: Vec<AssetSpec>,
    #[serde(default)]
    pub render: RenderOpts,
    #[serde(default)]
    pub view: SceneView,
    /// Directory holding `{blue,stbn,fast}_{i}.png` noise layers.
    #[serde(default)]
    pub noise_dir: Option<PathBuf>,
    /// Directory relative paths are resolved against. Set by `from_path`.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_scene() -> String {
    "scene".to_string()
}

impl VolumeManifest {
    pub fn from_json_str(s: &str) -> NanoVolumeResult<Self> {
        let manifest: Self =
            serde_json::from_str(s).map_err(|e| NanoVolumeError::serde(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_path(path: &Path) -> NanoVolumeResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read manifest '{}'", path.display()))?;
        let mut manifest = Self::from_json_str(&text)?;
        manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        if let Some(dir) = manifest.noise_dir.take() {
            manifest.noise_dir = Some(if dir.is_absolute() {
                dir
            } else {
                manifest.base_dir.join(dir)
            });
        }
        Ok(manifest)
    }

    pub fn validate(&self) -> NanoVolumeResult<()> {
        if self.assets.is_empty() {
            return Err(NanoVolumeError::validation("manifest lists no assets"));
        }
        if self.scene.trim().is_empty() {
            return Err(NanoVolumeError::validation("scene name must be non-empty"));
        }
        for (i, a) in self.assets.iter().enumerate() {
            if a.path.trim().is_empty() {
                return Err(NanoVolumeError::validation(format!(
                    "assets[{i}].path must be non-empty"
                )));
            }
            let positive = [a.density, a.gt_density, a.gt_light_ray_length];
            if positive.into_iter().flatten().any(|v| !(v.is_finite() && v > 0.0)) {
                return Err(NanoVolumeError::validation(format!(
                    "assets[{i}] densities and ray lengths must be > 0"
                )));
            }
            if a.noise_strength.is_some_and(|v| !(v.is_finite() && v >= 0.0)) {
                return Err(NanoVolumeError::validation(format!(
                    "assets[{i}].noise_strength must be >= 0"
                )));
            }
            if a.light_step_samples == Some(0) || a.gt_light_step_samples == Some(0) {
                return Err(NanoVolumeError::validation(format!(
                    "assets[{i}] step counts must be > 0"
                )));
            }
        }
        self.render.validate()
    }

    /// Build an unloaded store, resolving relative asset paths against `base_dir`.
    pub fn to_store(&self) -> VolumeAssetStore {
        VolumeAssetStore::new(
            self.assets
                .iter()
                .map(|a| a.to_asset(&self.base_dir))
                .collect(),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/manifest.rs"]
mod tests;
