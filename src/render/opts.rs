use crate::foundation::core::{Canvas, Vec3, forward_from_euler_deg};
use crate::foundation::error::{NanoVolumeError, NanoVolumeResult};

/// EMA temporal filter configuration.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemporalOpts {
    /// Weight of the history buffer in `final = lerp(sample, history, w)`. Must be in `[0, 1)`.
    pub history_weight: f32,
    /// When `true`, the first temporal frame after temporal filtering was (re-)enabled, after the
    /// active model changed, or at session start blends with weight 0 so stale history never
    /// leaks into the output. When `false`, stale history is blended as-is.
    pub reseed_history_on_enable: bool,
}

impl Default for TemporalOpts {
    fn default() -> Self {
        Self {
            history_weight: 0.9,
            reseed_history_on_enable: true,
        }
    }
}

/// Session-level render configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOpts {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Frame counter cycle (number of time-varying noise layers addressed).
    pub cycle_length: u32,
    /// Temporal filter settings.
    pub temporal: TemporalOpts,
    /// Near clip distance along view rays.
    pub clip_min: f32,
    /// Far clip distance along view rays.
    pub clip_max: f32,
    /// Primary ray-march steps through the volume bounds.
    pub view_steps: u32,
    /// Primary steps used when rendering ground truth.
    pub gt_view_steps: u32,
    /// Shadow-ray length used by interactive rendering.
    pub light_ray_length: f32,
    /// Half extent of the cube the volume lattice is mapped into.
    pub volume_half_extent: f32,
    /// Vertical field of view in degrees.
    pub fov_y_deg: f32,
    /// Edge length of generated white-noise layers.
    pub noise_size: u32,
    /// Seed for generated noise banks.
    pub seed: u64,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            cycle_length: 64,
            temporal: TemporalOpts::default(),
            clip_min: 0.01,
            clip_max: 1500.0,
            view_steps: 96,
            gt_view_steps: 512,
            light_ray_length: 0.5,
            volume_half_extent: 1.0,
            fov_y_deg: 60.0,
            noise_size: 128,
            seed: 0x5EED,
        }
    }
}

impl RenderOpts {
    pub fn canvas(&self) -> NanoVolumeResult<Canvas> {
        Canvas::new(self.width, self.height)
    }

    pub fn validate(&self) -> NanoVolumeResult<()> {
        self.canvas()?;
        if self.cycle_length == 0 {
            return Err(NanoVolumeError::validation("cycle_length must be > 0"));
        }
        let w = self.temporal.history_weight;
        if !w.is_finite() || !(0.0..1.0).contains(&w) {
            return Err(NanoVolumeError::validation(
                "temporal.history_weight must be in [0, 1)",
            ));
        }
        if !(self.clip_min >= 0.0 && self.clip_max > self.clip_min) {
            return Err(NanoVolumeError::validation(
                "clip planes must satisfy 0 <= clip_min < clip_max",
            ));
        }
        if self.view_steps == 0 || self.gt_view_steps == 0 {
            return Err(NanoVolumeError::validation(
                "view_steps and gt_view_steps must be > 0",
            ));
        }
        if !(self.volume_half_extent > 0.0) {
            return Err(NanoVolumeError::validation(
                "volume_half_extent must be > 0",
            ));
        }
        if !(self.fov_y_deg > 0.0 && self.fov_y_deg < 180.0) {
            return Err(NanoVolumeError::validation(
                "fov_y_deg must be in (0, 180)",
            ));
        }
        if self.noise_size == 0 {
            return Err(NanoVolumeError::validation("noise_size must be > 0"));
        }
        Ok(())
    }
}

/// Sun and camera placement. Rotations are euler angles in degrees.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneView {
    pub sun_rotation: Vec3,
    pub camera_position: Vec3,
    pub camera_rotation: Vec3,
}

impl Default for SceneView {
    fn default() -> Self {
        Self {
            sun_rotation: Vec3::new(50.0, -30.0, 0.0),
            camera_position: Vec3::new(0.0, 0.0, -3.0),
            camera_rotation: Vec3::ZERO,
        }
    }
}

impl SceneView {
    /// Direction the sunlight travels.
    pub fn light_dir(&self) -> Vec3 {
        forward_from_euler_deg(self.sun_rotation)
    }
}
