use rayon::prelude::*;

use crate::{
    foundation::core::{Canvas, SpatialFilter},
    foundation::error::{NanoVolumeError, NanoVolumeResult},
};

const GAUSSIAN_SIGMA: f32 = 1.0;
const GAUSSIAN_RADIUS: u32 = 2;

/// Normalized 1D taps of a separable filter. `None` is the identity kernel `[1]`.
pub fn kernel_weights(filter: SpatialFilter) -> Vec<f32> {
    match filter {
        SpatialFilter::None => vec![1.0],
        SpatialFilter::Gaussian => gaussian_kernel(GAUSSIAN_RADIUS, GAUSSIAN_SIGMA),
        SpatialFilter::Box3x3 => vec![1.0 / 3.0; 3],
        SpatialFilter::Box5x5 => vec![1.0 / 5.0; 5],
        SpatialFilter::Binomial3x3 => [1.0, 2.0, 1.0].iter().map(|w| w / 4.0).collect(),
        SpatialFilter::Binomial5x5 => [1.0, 4.0, 6.0, 4.0, 1.0]
            .iter()
            .map(|w| w / 16.0)
            .collect(),
    }
}

fn gaussian_kernel(radius: u32, sigma: f32) -> Vec<f32> {
    let r = radius as i32;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f32> = (-r..=r)
        .map(|i| {
            let x = i as f32;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

fn check_len(len: usize, canvas: Canvas, what: &str) -> NanoVolumeResult<()> {
    if len != canvas.pixel_count() {
        return Err(NanoVolumeError::validation(format!(
            "{what} expects {} pixels, got {len}",
            canvas.pixel_count()
        )));
    }
    Ok(())
}

/// Separable convolution of `src` into `dst` with clamp-to-edge sampling.
pub fn apply_spatial_filter(
    src: &[[f32; 4]],
    dst: &mut [[f32; 4]],
    canvas: Canvas,
    filter: SpatialFilter,
) -> NanoVolumeResult<()> {
    check_len(src.len(), canvas, "spatial filter source")?;
    check_len(dst.len(), canvas, "spatial filter target")?;
    if filter == SpatialFilter::None {
        dst.copy_from_slice(src);
        return Ok(());
    }

    let kernel = kernel_weights(filter);
    let mut tmp = vec![[0.0f32; 4]; src.len()];
    horizontal_pass(src, &mut tmp, canvas, &kernel);
    vertical_pass(&tmp, dst, canvas, &kernel);
    Ok(())
}

fn horizontal_pass(src: &[[f32; 4]], dst: &mut [[f32; 4]], canvas: Canvas, k: &[f32]) {
    let radius = (k.len() / 2) as i32;
    let w = canvas.width as i32;
    dst.par_chunks_mut(canvas.width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let base = y * canvas.width as usize;
            for (x, out) in row.iter_mut().enumerate() {
                let mut acc = [0.0f32; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x as i32 + ki as i32 - radius).clamp(0, w - 1) as usize;
                    let px = src[base + sx];
                    for c in 0..4 {
                        acc[c] += kw * px[c];
                    }
                }
                *out = acc;
            }
        });
}

fn vertical_pass(src: &[[f32; 4]], dst: &mut [[f32; 4]], canvas: Canvas, k: &[f32]) {
    let radius = (k.len() / 2) as i32;
    let w = canvas.width as usize;
    let h = canvas.height as i32;
    dst.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut acc = [0.0f32; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y as i32 + ki as i32 - radius).clamp(0, h - 1) as usize;
                let px = src[sy * w + x];
                for c in 0..4 {
                    acc[c] += kw * px[c];
                }
            }
            *out = acc;
        }
    });
}

/// `out = lerp(sample, history, history_weight)` per channel.
pub fn blend_ema(
    sample: &[[f32; 4]],
    history: &[[f32; 4]],
    out: &mut [[f32; 4]],
    history_weight: f32,
) -> NanoVolumeResult<()> {
    if sample.len() != history.len() || sample.len() != out.len() {
        return Err(NanoVolumeError::validation(format!(
            "temporal blend surfaces differ in size ({}, {}, {})",
            sample.len(),
            history.len(),
            out.len()
        )));
    }
    if !history_weight.is_finite() || !(0.0..1.0).contains(&history_weight) {
        return Err(NanoVolumeError::validation(
            "history weight must be in [0, 1)",
        ));
    }
    out.par_iter_mut()
        .zip(sample.par_iter().zip(history.par_iter()))
        .for_each(|(o, (s, h))| {
            for c in 0..4 {
                o[c] = s[c] + (h[c] - s[c]) * history_weight;
            }
        });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/filters.rs"]
mod tests;
