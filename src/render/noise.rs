use std::{collections::HashSet, path::Path};

use anyhow::Context as _;

use crate::{
    foundation::core::NoiseKind,
    foundation::error::{NanoVolumeError, NanoVolumeResult},
    foundation::rng::Pcg32,
};

/// A stack of square scalar noise layers, indexed per frame by `frame % depth`.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseBank {
    kind: NoiseKind,
    size: u32,
    depth: u32,
    /// `depth` layers of `size * size` values in `[0, 1)`, layer-major.
    values: Vec<f32>,
}

impl NoiseBank {
    pub fn from_values(
        kind: NoiseKind,
        size: u32,
        depth: u32,
        values: Vec<f32>,
    ) -> NanoVolumeResult<Self> {
        if !kind.is_stored() {
            return Err(NanoVolumeError::validation(format!(
                "noise kind '{}' is analytic and has no layer bank",
                kind.name()
            )));
        }
        if size == 0 || depth == 0 {
            return Err(NanoVolumeError::validation(
                "noise bank size and depth must be > 0",
            ));
        }
        let expected = (size as usize) * (size as usize) * (depth as usize);
        if values.len() != expected {
            return Err(NanoVolumeError::validation(format!(
                "noise bank expects {expected} values, got {}",
                values.len()
            )));
        }
        Ok(Self {
            kind,
            size,
            depth,
            values,
        })
    }

    /// Uniform random layers drawn from `rng`.
    pub fn white(size: u32, depth: u32, rng: &mut Pcg32) -> NanoVolumeResult<Self> {
        let n = (size as usize) * (size as usize) * (depth as usize);
        let values = (0..n).map(|_| rng.next_f32()).collect();
        Self::from_values(NoiseKind::White, size, depth, values)
    }

    /// Load layers `{prefix}_{i}.png` (`i` in `0..`) from `dir` until the first missing index.
    /// Layers are read as 8-bit luminance and must share one square size.
    pub fn load_layers(kind: NoiseKind, dir: &Path, prefix: &str) -> NanoVolumeResult<Self> {
        let mut size = None;
        let mut depth = 0u32;
        let mut values = Vec::new();
        loop {
            let path = dir.join(format!("{prefix}_{depth}.png"));
            if !path.is_file() {
                break;
            }
            let img = image::open(&path)
                .with_context(|| format!("read noise layer '{}'", path.display()))?
                .into_luma8();
            if img.width() != img.height() {
                return Err(NanoVolumeError::validation(format!(
                    "noise layer '{}' is not square",
                    path.display()
                )));
            }
            match size {
                None => size = Some(img.width()),
                Some(s) if s != img.width() => {
                    return Err(NanoVolumeError::validation(format!(
                        "noise layer '{}' is {}px, expected {s}px",
                        path.display(),
                        img.width()
                    )));
                }
                Some(_) => {}
            }
            values.extend(img.pixels().map(|p| f32::from(p.0[0]) / 256.0));
            depth += 1;
        }

        let Some(size) = size else {
            return Err(NanoVolumeError::not_ready(format!(
                "no '{prefix}_0.png' noise layer in '{}'",
                dir.display()
            )));
        };
        tracing::debug!(kind = kind.name(), size, depth, "loaded noise layers");
        Self::from_values(kind, size, depth, values)
    }

    pub fn kind(&self) -> NoiseKind {
        self.kind
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Value at pixel `(x, y)` of the layer addressed by `frame`. Pixels tile.
    pub fn sample(&self, x: u32, y: u32, frame: u32) -> f32 {
        let s = self.size as usize;
        let layer = (frame % self.depth) as usize;
        let idx = layer * s * s + (y as usize % s) * s + (x as usize % s);
        self.values[idx]
    }
}

/// Interleaved gradient noise, shifted per frame.
pub fn interleaved_gradient_noise(x: u32, y: u32, frame: u32) -> f32 {
    let fx = x as f32 + 5.588_238 * (frame % 64) as f32;
    let fy = y as f32 + 5.588_238 * (frame % 64) as f32;
    let inner = (0.067_110_56 * fx + 0.005_837_15 * fy).fract();
    (52.982_918 * inner).fract()
}

/// Offset source for pixel `(x, y)`: the stored layer when a bank is present, interleaved
/// gradient noise otherwise.
pub(crate) fn noise_at(bank: Option<&NoiseBank>, x: u32, y: u32, frame: u32) -> f32 {
    match bank {
        Some(bank) => bank.sample(x, y, frame),
        None => interleaved_gradient_noise(x, y, frame),
    }
}

/// Stored kinds whose missing bank was already reported, so each falls back with one warning.
#[derive(Debug, Default)]
pub(crate) struct FallbackWarnings {
    warned: HashSet<NoiseKind>,
}

impl FallbackWarnings {
    /// Report that `kind` has no bank. Only the first report per kind is logged; returns whether
    /// this one was.
    pub(crate) fn missing(&mut self, kind: NoiseKind) -> bool {
        let first = self.warned.insert(kind);
        if first {
            tracing::warn!(
                noise = kind.name(),
                "noise bank not uploaded; falling back to interleaved gradient noise"
            );
        }
        first
    }

    pub(crate) fn uploaded(&mut self, kind: NoiseKind) {
        self.warned.remove(&kind);
    }

    pub(crate) fn clear(&mut self) {
        self.warned.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/noise.rs"]
mod tests;
