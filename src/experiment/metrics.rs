use image::RgbImage;

use crate::foundation::error::{NanoVolumeError, NanoVolumeResult};

/// Which channels [`rmse`] sums per pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channels {
    /// First channel only. Grayscale frames store the same value in all three.
    Gray,
    #[default]
    Rgb,
}

impl Channels {
    pub fn count(self) -> usize {
        match self {
            Channels::Gray => 1,
            Channels::Rgb => 3,
        }
    }
}

/// Root-mean-square error between two equally sized frames.
///
/// Channel values are normalised to `[0, 1]`; the squared differences of the selected channels are
/// summed per pixel and averaged over pixels, so an all-black vs all-white RGB pair scores
/// `sqrt(3)`.
pub fn rmse(a: &RgbImage, b: &RgbImage, channels: Channels) -> NanoVolumeResult<f64> {
    if a.dimensions() != b.dimensions() {
        return Err(NanoVolumeError::DimensionMismatch {
            a_width: a.width(),
            a_height: a.height(),
            b_width: b.width(),
            b_height: b.height(),
        });
    }
    let pixels = a.width() as u64 * a.height() as u64;
    if pixels == 0 {
        return Ok(0.0);
    }

    let n = channels.count();
    let sum: f64 = a
        .pixels()
        .zip(b.pixels())
        .map(|(pa, pb)| {
            pa.0[..n]
                .iter()
                .zip(&pb.0[..n])
                .map(|(&x, &y)| {
                    let d = (x as f64 - y as f64) / 255.0;
                    d * d
                })
                .sum::<f64>()
        })
        .sum();
    Ok((sum / pixels as f64).sqrt())
}

/// [`rmse`], reporting `-1.0` (and a warning) instead of an error on a size mismatch.
pub fn rmse_or_sentinel(a: &RgbImage, b: &RgbImage, channels: Channels) -> f64 {
    match rmse(a, b, channels) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "rmse unavailable");
            -1.0
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/experiment/metrics.rs"]
mod tests;
