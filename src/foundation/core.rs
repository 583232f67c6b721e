use glam::{EulerRot, Quat};
pub use glam::Vec3;

use crate::foundation::error::{NanoVolumeError, NanoVolumeResult};

/// Forward (+Z) axis of a rotation given as euler angles in degrees (pitch about X, yaw about Y,
/// roll about Z, applied yaw-pitch-roll).
pub fn forward_from_euler_deg(euler: Vec3) -> Vec3 {
    let rot = Quat::from_euler(
        EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    );
    rot * Vec3::Z
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> NanoVolumeResult<Self> {
        if width == 0 || height == 0 {
            return Err(NanoVolumeError::validation(
                "canvas width and height must be > 0",
            ));
        }
        Ok(Self { width, height })
    }

    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }
}

/// Stochastic pattern used to jitter ray-march start offsets.
///
/// Ids match the control surface (`1..=5`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    /// Uniform random layers.
    White = 1,
    /// Blue-noise layers.
    Blue = 2,
    /// Spatio-temporal blue noise.
    Stbn = 3,
    /// Precomputed filter-adapted spatio-temporal layers.
    Fast = 4,
    /// Interleaved gradient noise, evaluated analytically.
    Ign = 5,
}

impl NoiseKind {
    pub const ALL: [NoiseKind; 5] = [
        NoiseKind::White,
        NoiseKind::Blue,
        NoiseKind::Stbn,
        NoiseKind::Fast,
        NoiseKind::Ign,
    ];

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn id(self) -> i32 {
        self as i32
    }

    /// Short name used in capture file stems.
    pub fn name(self) -> &'static str {
        match self {
            NoiseKind::White => "white",
            NoiseKind::Blue => "blue",
            NoiseKind::Stbn => "stbn",
            NoiseKind::Fast => "fast",
            NoiseKind::Ign => "ign",
        }
    }

    /// Whether the pattern needs a stored layer bank.
    pub fn is_stored(self) -> bool {
        !matches!(self, NoiseKind::Ign)
    }
}

/// Denoising kernel applied to the raw sample. Ids match the control surface (`1..=6`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialFilter {
    None = 1,
    Gaussian = 2,
    Box3x3 = 3,
    Box5x5 = 4,
    Binomial3x3 = 5,
    Binomial5x5 = 6,
}

impl SpatialFilter {
    pub const ALL: [SpatialFilter; 6] = [
        SpatialFilter::None,
        SpatialFilter::Gaussian,
        SpatialFilter::Box3x3,
        SpatialFilter::Box5x5,
        SpatialFilter::Binomial3x3,
        SpatialFilter::Binomial5x5,
    ];

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            SpatialFilter::None => "none",
            SpatialFilter::Gaussian => "gauss1_0",
            SpatialFilter::Box3x3 => "box3x3",
            SpatialFilter::Box5x5 => "box5x5",
            SpatialFilter::Binomial3x3 => "binom3x3",
            SpatialFilter::Binomial5x5 => "binom5x5",
        }
    }
}

/// Cyclic index into time-varying noise layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameCounter {
    value: u32,
    cycle: u32,
}

impl FrameCounter {
    pub fn new(cycle: u32) -> NanoVolumeResult<Self> {
        if cycle == 0 {
            return Err(NanoVolumeError::validation("frame cycle length must be > 0"));
        }
        Ok(Self { value: 0, cycle })
    }

    pub fn value(self) -> u32 {
        self.value
    }

    pub fn advance(&mut self) -> u32 {
        self.value = (self.value + 1) % self.cycle;
        self.value
    }
}

/// Base name of a volume path without directories or extension
/// (`"Assets/wdas_cloud_half.nvdb"` -> `"wdas_cloud_half"`).
pub fn volume_stem(path: &str) -> String {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match file.rfind('.') {
        Some(0) | None => file.to_string(),
        Some(dot) => file[..dot].to_string(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
