use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    experiment::capture::{CaptureTarget, capture_ground_truth, write_png},
    experiment::metrics::{Channels, rmse_or_sentinel},
    foundation::error::{NanoVolumeError, NanoVolumeResult},
};

/// Files written by [`save_snapshot`].
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotReport {
    pub image_path: PathBuf,
    pub ground_truth_path: PathBuf,
    pub sidecar_path: PathBuf,
    pub rmse: f64,
}

/// Save the target's current frame next to a matching ground-truth frame and a sidecar carrying
/// the RMSE between the two. Files are named `{volume}_{label}.png`, `{volume}_{label}_GT.png`
/// and `{volume}_{label}.txt`.
#[tracing::instrument(skip(target))]
pub fn save_snapshot<T: CaptureTarget + ?Sized>(
    target: &mut T,
    out_dir: &Path,
    label: &str,
    channels: Channels,
) -> NanoVolumeResult<SnapshotReport> {
    if label.is_empty() || label.contains(['/', '\\']) {
        return Err(NanoVolumeError::validation(format!(
            "snapshot label '{label}' must be a non-empty file-name fragment"
        )));
    }
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create snapshot dir '{}'", out_dir.display()))?;

    let descriptor = target.describe();
    let base = format!("{}_{label}", descriptor.volume_name);

    let sample = target.read_frame()?;
    let image_path = out_dir.join(format!("{base}.png"));
    write_png(&sample, &image_path)?;

    let ground_truth = capture_ground_truth(target)?;
    let ground_truth_path = out_dir.join(format!("{base}_GT.png"));
    write_png(&ground_truth, &ground_truth_path)?;

    let rmse = rmse_or_sentinel(&sample, &ground_truth, channels);
    let sidecar_path = out_dir.join(format!("{base}.txt"));
    descriptor.sidecar(rmse).write(&sidecar_path)?;

    tracing::info!(path = %image_path.display(), rmse, "snapshot saved");
    Ok(SnapshotReport {
        image_path,
        ground_truth_path,
        sidecar_path,
        rmse,
    })
}
