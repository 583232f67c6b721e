use std::{
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use image::RgbImage;

use crate::{
    assets::store::VolumeAsset,
    experiment::metrics::{Channels, rmse_or_sentinel},
    experiment::sidecar::SidecarRecord,
    foundation::core::{NoiseKind, SpatialFilter},
    foundation::error::{NanoVolumeError, NanoVolumeResult},
    render::device::RenderDevice,
    render::opts::SceneView,
    render::pipeline::{RenderPipeline, TickReport},
};

/// Experiment configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureOpts {
    /// Directory receiving frames, the ground-truth frame and the sidecar.
    pub out_dir: PathBuf,
    /// Frames captured per run.
    pub max_frames: usize,
    /// Channels compared by the RMSE diagnostics.
    pub channels: Channels,
    /// Scene name leading every file stem.
    pub scene: String,
}

impl Default for CaptureOpts {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("captures"),
            max_frames: 32,
            channels: Channels::Rgb,
            scene: "scene".to_string(),
        }
    }
}

impl CaptureOpts {
    pub fn validate(&self) -> NanoVolumeResult<()> {
        if self.max_frames == 0 {
            return Err(NanoVolumeError::validation("max_frames must be > 0"));
        }
        if self.scene.trim().is_empty() {
            return Err(NanoVolumeError::validation("scene name must be non-empty"));
        }
        Ok(())
    }
}

/// Render settings a capture records in file names and sidecars.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureDescriptor {
    pub volume_name: String,
    pub noise: NoiseKind,
    pub spatial: SpatialFilter,
    pub temporal: bool,
    pub density: f32,
    pub light_steps: u32,
    pub view: SceneView,
}

impl CaptureDescriptor {
    /// `{scene}_{noise}_{ema|none}_{spatial}`.
    pub fn stem(&self, scene: &str) -> String {
        let temporal = if self.temporal { "ema" } else { "none" };
        format!(
            "{scene}_{}_{temporal}_{}",
            self.noise.name(),
            self.spatial.name()
        )
    }

    pub fn sidecar(&self, rmse: f64) -> SidecarRecord {
        SidecarRecord {
            name: self.volume_name.clone(),
            sun_rotation: self.view.sun_rotation,
            camera_position: self.view.camera_position,
            camera_rotation: self.view.camera_rotation,
            density: self.density,
            light_steps: self.light_steps,
            noise: self.noise.id(),
            spatial: self.spatial.id(),
            temporal: self.temporal,
            rmse,
        }
    }
}

/// What a capture reads frames from and toggles into ground truth.
pub trait CaptureTarget {
    /// Current output frame.
    fn read_frame(&mut self) -> NanoVolumeResult<RgbImage>;

    fn ground_truth(&self) -> bool;

    /// Set the ground-truth flag, returning the previous value.
    fn set_ground_truth(&mut self, on: bool) -> bool;

    /// Render one frame with the current settings.
    fn render_frame(&mut self) -> TickReport;

    fn describe(&self) -> CaptureDescriptor;
}

impl<D: RenderDevice> CaptureTarget for RenderPipeline<D> {
    fn read_frame(&mut self) -> NanoVolumeResult<RgbImage> {
        RenderPipeline::read_frame(self)
    }

    fn ground_truth(&self) -> bool {
        RenderPipeline::ground_truth(self)
    }

    fn set_ground_truth(&mut self, on: bool) -> bool {
        RenderPipeline::set_ground_truth(self, on)
    }

    fn render_frame(&mut self) -> TickReport {
        self.advance()
    }

    fn describe(&self) -> CaptureDescriptor {
        let asset = self.active_asset();
        CaptureDescriptor {
            volume_name: asset.map_or_else(|| "none".to_string(), VolumeAsset::volume_name),
            noise: self.noise(),
            spatial: self.spatial(),
            temporal: self.temporal(),
            density: asset.map_or(0.0, |a| a.density),
            light_steps: asset.map_or(0, |a| a.light_step_samples),
            view: *self.view(),
        }
    }
}

/// Holds a target in (or out of) ground-truth mode; the previous flag is restored on drop,
/// including during unwinding.
pub struct GroundTruthGuard<'a, T: CaptureTarget + ?Sized> {
    target: &'a mut T,
    previous: bool,
}

impl<'a, T: CaptureTarget + ?Sized> GroundTruthGuard<'a, T> {
    pub fn new(target: &'a mut T, on: bool) -> Self {
        let previous = target.set_ground_truth(on);
        Self { target, previous }
    }

    pub fn previous(&self) -> bool {
        self.previous
    }
}

impl<T: CaptureTarget + ?Sized> Deref for GroundTruthGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.target
    }
}

impl<T: CaptureTarget + ?Sized> DerefMut for GroundTruthGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.target
    }
}

impl<T: CaptureTarget + ?Sized> Drop for GroundTruthGuard<'_, T> {
    fn drop(&mut self) {
        self.target.set_ground_truth(self.previous);
    }
}

/// Render and read one ground-truth frame, leaving the target's mode as it was.
pub(crate) fn capture_ground_truth<T: CaptureTarget + ?Sized>(
    target: &mut T,
) -> NanoVolumeResult<RgbImage> {
    let mut gt = GroundTruthGuard::new(target, true);
    match gt.render_frame() {
        TickReport::Rendered { .. } => gt.read_frame(),
        TickReport::Idle => Err(NanoVolumeError::not_ready(
            "no loaded volume to render ground truth from",
        )),
        TickReport::Skipped { reason, .. } => Err(NanoVolumeError::device(format!(
            "ground-truth render failed: {reason}"
        ))),
    }
}

pub(crate) fn write_png(img: &RgbImage, path: &Path) -> NanoVolumeResult<()> {
    img.save(path)
        .with_context(|| format!("write image '{}'", path.display()))?;
    Ok(())
}

/// State of one bounded capture run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExperimentRun {
    max_frames: usize,
    current_index: usize,
    frames: Vec<Option<RgbImage>>,
    rmse: Vec<Option<f64>>,
    is_running: bool,
}

impl ExperimentRun {
    fn started(max_frames: usize) -> Self {
        Self {
            max_frames,
            current_index: 0,
            frames: vec![None; max_frames],
            rmse: vec![None; max_frames],
            is_running: true,
        }
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn frames(&self) -> &[Option<RgbImage>] {
        &self.frames
    }

    /// Per-frame RMSE against the reference, for frames captured while one was set.
    pub fn rmse(&self) -> &[Option<f64>] {
        &self.rmse
    }
}

/// Files written by [`ExperimentCapture::save`].
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureReport {
    pub stem: String,
    pub frame_paths: Vec<PathBuf>,
    pub ground_truth_path: PathBuf,
    pub sidecar_path: PathBuf,
    /// RMSE of the last captured frame against the ground truth (`-1` if unavailable).
    pub rmse: f64,
}

/// Outcome of one [`ExperimentCapture::tick`].
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureTick {
    NotRunning,
    /// Frame stored in slot `index`.
    Captured { index: usize, rmse: Option<f64> },
    /// The run was full; it was saved and stopped.
    Saved(CaptureReport),
    /// Reading or saving failed. A failed save stops the run but keeps its frames.
    Failed { reason: String },
}

/// Drives fixed-length frame accumulation and persists the results.
#[derive(Debug)]
pub struct ExperimentCapture {
    opts: CaptureOpts,
    run: ExperimentRun,
    reference: Option<RgbImage>,
}

impl ExperimentCapture {
    pub fn new(opts: CaptureOpts) -> NanoVolumeResult<Self> {
        opts.validate()?;
        let run = ExperimentRun {
            max_frames: opts.max_frames,
            ..ExperimentRun::default()
        };
        Ok(Self {
            opts,
            run,
            reference: None,
        })
    }

    pub fn opts(&self) -> &CaptureOpts {
        &self.opts
    }

    pub fn run(&self) -> &ExperimentRun {
        &self.run
    }

    pub fn is_running(&self) -> bool {
        self.run.is_running
    }

    /// Change the run length for the next [`start`](Self::start). Ignored while `target` renders
    /// ground truth, while a run is in progress, or for `0`.
    pub fn set_max_frames<T: CaptureTarget + ?Sized>(
        &mut self,
        target: &T,
        max_frames: usize,
    ) -> bool {
        if target.ground_truth() {
            tracing::debug!(max_frames, "ignored while rendering ground truth");
            return false;
        }
        if self.run.is_running {
            tracing::debug!(max_frames, "ignored while a capture is running");
            return false;
        }
        if max_frames == 0 {
            tracing::warn!("max_frames must be > 0");
            return false;
        }
        self.opts.max_frames = max_frames;
        self.run.max_frames = max_frames;
        true
    }

    /// Frame each captured frame is scored against; `None` disables per-frame RMSE.
    pub fn set_reference(&mut self, reference: Option<RgbImage>) {
        self.reference = reference;
    }

    /// Begin a new run, discarding any previous one.
    pub fn start(&mut self) {
        self.run = ExperimentRun::started(self.opts.max_frames);
        tracing::info!(max_frames = self.opts.max_frames, "capture started");
    }

    /// Capture the target's current output into the next slot, or save and stop once every slot
    /// is filled. Errors are logged and reported, never propagated.
    pub fn tick<T: CaptureTarget + ?Sized>(&mut self, target: &mut T) -> CaptureTick {
        if !self.run.is_running {
            return CaptureTick::NotRunning;
        }

        if self.run.current_index >= self.run.max_frames {
            self.run.is_running = false;
            return match self.save(target) {
                Ok(report) => {
                    self.run = ExperimentRun {
                        max_frames: self.opts.max_frames,
                        ..ExperimentRun::default()
                    };
                    CaptureTick::Saved(report)
                }
                Err(e) => {
                    tracing::error!(error = %e, "capture save failed");
                    CaptureTick::Failed {
                        reason: e.to_string(),
                    }
                }
            };
        }

        let index = self.run.current_index;
        let frame = match target.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(index, error = %e, "frame capture failed");
                return CaptureTick::Failed {
                    reason: e.to_string(),
                };
            }
        };
        let rmse = self
            .reference
            .as_ref()
            .map(|r| rmse_or_sentinel(&frame, r, self.opts.channels));
        match rmse {
            Some(rmse) => tracing::info!(index, rmse, "frame captured"),
            None => tracing::debug!(index, "frame captured"),
        }

        self.run.frames[index] = Some(frame);
        self.run.rmse[index] = rmse;
        self.run.current_index += 1;
        CaptureTick::Captured { index, rmse }
    }

    /// Write every captured frame, one ground-truth frame and the sidecar.
    ///
    /// The target is switched into ground truth for exactly one rendered frame and switched back
    /// on every exit path. Noise, spatial and temporal settings are never touched.
    #[tracing::instrument(skip_all, fields(out_dir = %self.opts.out_dir.display()))]
    pub fn save<T: CaptureTarget + ?Sized>(
        &mut self,
        target: &mut T,
    ) -> NanoVolumeResult<CaptureReport> {
        let frames: Vec<&RgbImage> = self
            .run
            .frames
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.as_ref().ok_or_else(|| {
                    NanoVolumeError::not_ready(format!("frame slot {i} was never captured"))
                })
            })
            .collect::<NanoVolumeResult<_>>()?;
        let Some(last) = frames.last() else {
            return Err(NanoVolumeError::not_ready("no frames were captured"));
        };

        let dir = &self.opts.out_dir;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create capture dir '{}'", dir.display()))?;

        let descriptor = target.describe();
        let stem = descriptor.stem(&self.opts.scene);

        let mut frame_paths = Vec::with_capacity(frames.len());
        for (i, frame) in frames.iter().enumerate() {
            let path = dir.join(format!("{stem}_{i:02}.png"));
            write_png(frame, &path)?;
            frame_paths.push(path);
        }

        let ground_truth = capture_ground_truth(target)?;
        let ground_truth_path = dir.join(format!("{stem}_GT.png"));
        write_png(&ground_truth, &ground_truth_path)?;

        let rmse = rmse_or_sentinel(last, &ground_truth, self.opts.channels);
        let sidecar_path = dir.join(format!("{stem}.txt"));
        descriptor.sidecar(rmse).write(&sidecar_path)?;

        tracing::info!(
            stem = %stem,
            frames = frame_paths.len(),
            rmse,
            "capture saved"
        );
        Ok(CaptureReport {
            stem,
            frame_paths,
            ground_truth_path,
            sidecar_path,
            rmse,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/experiment/capture.rs"]
mod tests;
