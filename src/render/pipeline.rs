use std::{collections::VecDeque, path::Path, time::Duration, time::Instant};

use crate::{
    assets::decode::VolumeDecoder,
    assets::loader::{LoadReport, VolumeLoader},
    assets::store::{VolumeAsset, VolumeAssetStore, wrap_index},
    foundation::core::{Canvas, FrameCounter, NoiseKind, SpatialFilter},
    foundation::error::{NanoVolumeError, NanoVolumeResult},
    foundation::rng::Pcg32,
    render::device::{BufferHandle, RenderDevice, SurfaceId},
    render::noise::NoiseBank,
    render::opts::{RenderOpts, SceneView},
    render::plan::{
        CompositePass, CopyPass, FramePlan, GroundTruthPass, MarchParams, NoisePass, Pass,
        SamplePass, SpatialPass, TemporalPass, execute_plan,
    },
};

/// Per-tick pipeline state, derived from the inputs on every call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// No loaded asset; nothing is rendered.
    Idle,
    /// Noise-free reference render straight to the output.
    GroundTruth,
    /// Sample and spatial filter, no history.
    InteractiveNoTemporal,
    /// Sample, spatial filter, EMA blend and history update.
    InteractiveTemporal,
}

impl PipelineState {
    pub fn select(asset_loaded: bool, ground_truth: bool, temporal: bool) -> Self {
        match (asset_loaded, ground_truth, temporal) {
            (false, _, _) => Self::Idle,
            (true, true, _) => Self::GroundTruth,
            (true, false, false) => Self::InteractiveNoTemporal,
            (true, false, true) => Self::InteractiveTemporal,
        }
    }

    pub fn is_interactive(self) -> bool {
        matches!(
            self,
            Self::InteractiveNoTemporal | Self::InteractiveTemporal
        )
    }
}

/// What one [`RenderPipeline::advance`] call did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickReport {
    /// Every pass ran. `frame` is the counter value the sample used.
    Rendered { state: PipelineState, frame: u32 },
    /// No loaded asset; the output keeps its previous contents.
    Idle,
    /// A pass failed; the output may be stale.
    Skipped { state: PipelineState, reason: String },
}

impl TickReport {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}

/// Rolling frame-time average.
#[derive(Clone, Debug)]
pub struct FrameTimer {
    window: usize,
    samples: VecDeque<Duration>,
    last: Option<Instant>,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FrameTimer {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            samples: VecDeque::with_capacity(window.max(1)),
            last: None,
        }
    }

    /// Record a tick at `now`. Returns the average FPS once per completed window.
    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        let prev = self.last.replace(now)?;
        self.samples.push_back(now.saturating_duration_since(prev));
        if self.samples.len() < self.window {
            return None;
        }
        let fps = self.fps();
        self.samples.clear();
        fps
    }

    /// Average FPS over the recorded samples.
    pub fn fps(&self) -> Option<f64> {
        let total: Duration = self.samples.iter().sum();
        if self.samples.is_empty() || total.is_zero() {
            return None;
        }
        Some(self.samples.len() as f64 / total.as_secs_f64())
    }
}

/// Frame-synchronous render orchestrator.
///
/// Owns the device, the asset store and the per-session surfaces. Call [`advance`](Self::advance)
/// once per frame; the control methods take effect on the next call.
pub struct RenderPipeline<D: RenderDevice> {
    device: D,
    store: VolumeAssetStore,
    opts: RenderOpts,
    view: SceneView,
    canvas: Canvas,
    active: usize,
    noise: NoiseKind,
    spatial: SpatialFilter,
    ground_truth: bool,
    temporal: bool,
    show_noise: bool,
    counter: FrameCounter,
    history_valid: bool,
    timer: FrameTimer,
    torn_down: bool,
}

impl<D: RenderDevice> RenderPipeline<D> {
    /// Allocate the session surfaces and upload a seeded white-noise bank.
    pub fn new(
        mut device: D,
        store: VolumeAssetStore,
        opts: RenderOpts,
        view: SceneView,
    ) -> NanoVolumeResult<Self> {
        opts.validate()?;
        let canvas = opts.canvas()?;
        for id in SurfaceId::ALL {
            device.ensure_surface(id, canvas)?;
        }
        let mut rng = Pcg32::new(opts.seed);
        let white = NoiseBank::white(opts.noise_size, opts.cycle_length, &mut rng)?;
        device.upload_noise_bank(&white)?;

        let counter = FrameCounter::new(opts.cycle_length)?;
        tracing::debug!(
            width = canvas.width,
            height = canvas.height,
            assets = store.len(),
            "render pipeline ready"
        );
        Ok(Self {
            device,
            store,
            opts,
            view,
            canvas,
            active: 0,
            noise: NoiseKind::White,
            spatial: SpatialFilter::None,
            ground_truth: false,
            temporal: true,
            show_noise: false,
            counter,
            history_valid: false,
            timer: FrameTimer::default(),
            torn_down: false,
        })
    }

    /// Decode and bind every asset in the store.
    pub fn load_assets<Dec: VolumeDecoder>(&mut self, loader: &VolumeLoader<Dec>) -> LoadReport {
        let report = loader.load_all(&mut self.store, &mut self.device);
        self.history_valid = false;
        report
    }

    /// Load `{blue,stbn,fast}_{i}.png` layer banks from `dir`. Missing banks are logged and
    /// left to the device's fallback; returns how many were uploaded.
    pub fn load_noise_banks(&mut self, dir: &Path) -> usize {
        let mut uploaded = 0;
        for kind in [NoiseKind::Blue, NoiseKind::Stbn, NoiseKind::Fast] {
            let result = NoiseBank::load_layers(kind, dir, kind.name())
                .and_then(|bank| self.device.upload_noise_bank(&bank));
            match result {
                Ok(()) => uploaded += 1,
                Err(e) => tracing::warn!(noise = kind.name(), error = %e, "noise bank unavailable"),
            }
        }
        uploaded
    }

    /// The active asset. An empty store is idle, not an out-of-range lookup.
    fn lookup_active(&self) -> Option<&VolumeAsset> {
        if self.store.is_empty() {
            return None;
        }
        self.store.get(self.active)
    }

    fn select_state(&self, asset: Option<&VolumeAsset>) -> PipelineState {
        let loaded = asset.is_some_and(VolumeAsset::is_loaded);
        PipelineState::select(loaded, self.ground_truth, self.temporal)
    }

    pub fn state(&self) -> PipelineState {
        self.select_state(self.lookup_active())
    }

    /// Render one frame.
    ///
    /// Errors never escape: an unloaded asset yields [`TickReport::Idle`] and a failing pass
    /// yields [`TickReport::Skipped`], both logged.
    pub fn advance(&mut self) -> TickReport {
        if let Some(fps) = self.timer.tick_at(Instant::now()) {
            tracing::debug!(fps, "frame rate");
        }

        let active = self.lookup_active();
        let state = self.select_state(active);
        let Some((volume, asset)) = active.and_then(|a| a.buffer().map(|b| (b, a.clone()))) else {
            let e = NanoVolumeError::not_ready(format!("no loaded volume at index {}", self.active));
            tracing::debug!(error = %e, "tick skipped");
            return TickReport::Idle;
        };

        let frame = self.counter.value();
        let plan = self.build_plan(state, volume, &asset, frame);
        if let Err(e) = execute_plan(&mut self.device, &plan) {
            tracing::warn!(?state, error = %e, "frame passes failed");
            return TickReport::Skipped {
                state,
                reason: e.to_string(),
            };
        }

        match state {
            PipelineState::InteractiveTemporal if !self.show_noise => {
                self.history_valid = true;
                self.counter.advance();
            }
            PipelineState::InteractiveTemporal | PipelineState::InteractiveNoTemporal => {
                if self.opts.temporal.reseed_history_on_enable {
                    self.history_valid = false;
                }
                self.counter.advance();
            }
            PipelineState::GroundTruth | PipelineState::Idle => {}
        }
        TickReport::Rendered { state, frame }
    }

    fn march_params(&self, asset: &VolumeAsset, ground_truth: bool) -> MarchParams {
        let (density, light_steps, light_ray_length, view_steps) = if ground_truth {
            (
                asset.gt_density,
                asset.gt_light_step_samples,
                asset.gt_light_ray_length,
                self.opts.gt_view_steps,
            )
        } else {
            (
                asset.density,
                asset.light_step_samples,
                self.opts.light_ray_length,
                self.opts.view_steps,
            )
        };
        MarchParams {
            density,
            light_steps,
            light_ray_length,
            view_steps,
            clip_min: self.opts.clip_min,
            clip_max: self.opts.clip_max,
            half_extent: self.opts.volume_half_extent,
            light_dir: self.view.light_dir(),
            camera_position: self.view.camera_position,
            camera_rotation: self.view.camera_rotation,
            fov_y_deg: self.opts.fov_y_deg,
        }
    }

    fn build_plan(
        &self,
        state: PipelineState,
        volume: BufferHandle,
        asset: &VolumeAsset,
        frame: u32,
    ) -> FramePlan {
        let mut passes = Vec::with_capacity(5);
        match state {
            PipelineState::Idle => {}
            PipelineState::GroundTruth => {
                passes.push(Pass::GroundTruth(GroundTruthPass {
                    volume,
                    target: SurfaceId::Output,
                    march: self.march_params(asset, true),
                }));
            }
            PipelineState::InteractiveNoTemporal | PipelineState::InteractiveTemporal
                if self.show_noise =>
            {
                passes.push(Pass::Noise(NoisePass {
                    target: SurfaceId::Output,
                    noise: self.noise,
                    frame,
                }));
            }
            PipelineState::InteractiveNoTemporal | PipelineState::InteractiveTemporal => {
                passes.push(Pass::Sample(SamplePass {
                    volume,
                    target: SurfaceId::NewSample,
                    march: self.march_params(asset, false),
                    noise: self.noise,
                    noise_strength: asset.noise_strength,
                    frame,
                }));
                passes.push(Pass::Spatial(SpatialPass {
                    input: SurfaceId::NewSample,
                    output: SurfaceId::SpatialFiltered,
                    filter: self.spatial,
                }));
                if state == PipelineState::InteractiveTemporal {
                    passes.push(Pass::Temporal(TemporalPass {
                        sample: SurfaceId::SpatialFiltered,
                        history: SurfaceId::History,
                        output: SurfaceId::FinalFrame,
                        history_weight: self.effective_history_weight(),
                    }));
                    passes.push(Pass::Copy(CopyPass {
                        src: SurfaceId::FinalFrame,
                        dst: SurfaceId::History,
                    }));
                    passes.push(Pass::Composite(CompositePass {
                        src: SurfaceId::FinalFrame,
                    }));
                } else {
                    passes.push(Pass::Composite(CompositePass {
                        src: SurfaceId::SpatialFiltered,
                    }));
                }
            }
        }
        FramePlan {
            canvas: self.canvas,
            passes,
        }
    }

    /// History weight for the next temporal blend; 0 while the history needs re-seeding.
    pub fn effective_history_weight(&self) -> f32 {
        if self.opts.temporal.reseed_history_on_enable && !self.history_valid {
            0.0
        } else {
            self.opts.temporal.history_weight
        }
    }

    /// Select the noise pattern by control id (`1..=5`).
    pub fn set_noise_type(&mut self, id: i32) -> NanoVolumeResult<()> {
        let kind = NoiseKind::from_id(id).ok_or_else(|| {
            NanoVolumeError::validation(format!("noise id {id} is not in 1..=5"))
        })?;
        self.noise = kind;
        Ok(())
    }

    /// Select the spatial filter by control id (`1..=6`).
    pub fn set_spatial_filter(&mut self, id: i32) -> NanoVolumeResult<()> {
        let filter = SpatialFilter::from_id(id).ok_or_else(|| {
            NanoVolumeError::validation(format!("spatial filter id {id} is not in 1..=6"))
        })?;
        self.spatial = filter;
        Ok(())
    }

    pub fn toggle_ground_truth(&mut self) -> bool {
        self.ground_truth = !self.ground_truth;
        self.ground_truth
    }

    /// Set the ground-truth flag, returning the previous value.
    pub fn set_ground_truth(&mut self, on: bool) -> bool {
        std::mem::replace(&mut self.ground_truth, on)
    }

    /// Show the active noise layer instead of the rendered volume on interactive frames.
    pub fn toggle_show_noise(&mut self) -> bool {
        self.show_noise = !self.show_noise;
        self.show_noise
    }

    pub fn toggle_temporal_filtering(&mut self) -> bool {
        self.temporal = !self.temporal;
        if self.temporal && self.opts.temporal.reseed_history_on_enable {
            self.history_valid = false;
        }
        self.temporal
    }

    /// Step the active asset forward (`1`) or back (`-1`), wrapping. `None` if the store is
    /// empty or `direction` is anything else.
    pub fn load_next_model(&mut self, direction: i32) -> Option<usize> {
        if direction != 1 && direction != -1 {
            tracing::warn!(direction, "model direction must be 1 or -1");
            return None;
        }
        let next = wrap_index(self.active, direction, self.store.len())?;
        self.switch_to(next);
        Some(next)
    }

    pub fn set_active_asset(&mut self, index: usize) -> NanoVolumeResult<()> {
        if self.store.get(index).is_none() {
            return Err(NanoVolumeError::index_out_of_range(
                index as i64,
                self.store.len(),
            ));
        }
        self.switch_to(index);
        Ok(())
    }

    fn switch_to(&mut self, index: usize) {
        if index != self.active {
            self.history_valid = false;
        }
        self.active = index;
        if let Some(asset) = self.store.get(index) {
            tracing::info!(index, path = %asset.path, loaded = asset.is_loaded(), "active volume");
        }
    }

    fn frozen(&self, what: &str) -> bool {
        if self.ground_truth {
            tracing::debug!(what, "ignored while rendering ground truth");
        }
        self.ground_truth
    }

    /// Set the active asset's interactive density. Ignored in ground-truth mode.
    pub fn set_density(&mut self, density: f32) -> bool {
        if self.frozen("density") {
            return false;
        }
        match self.store.get_mut(self.active) {
            Some(asset) => {
                asset.density = density;
                true
            }
            None => false,
        }
    }

    /// Set the active asset's shadow-ray step count. Ignored in ground-truth mode.
    pub fn set_light_step_samples(&mut self, steps: u32) -> bool {
        if self.frozen("light_step_samples") {
            return false;
        }
        match self.store.get_mut(self.active) {
            Some(asset) => {
                asset.light_step_samples = steps;
                true
            }
            None => false,
        }
    }

    /// Scale applied to the sampled noise offset. Ignored in ground-truth mode.
    pub fn set_noise_strength(&mut self, strength: f32) -> bool {
        if self.frozen("noise_strength") {
            return false;
        }
        if !strength.is_finite() || strength < 0.0 {
            tracing::warn!(strength, "noise strength must be finite and >= 0");
            return false;
        }
        match self.store.get_mut(self.active) {
            Some(asset) => {
                asset.noise_strength = strength;
                true
            }
            None => false,
        }
    }

    /// Set the sun yaw in degrees. Ignored in ground-truth mode.
    pub fn set_sun_yaw(&mut self, yaw_deg: f32) -> bool {
        if self.frozen("sun_yaw") {
            return false;
        }
        self.view.sun_rotation.y = yaw_deg;
        true
    }

    pub fn noise(&self) -> NoiseKind {
        self.noise
    }

    pub fn spatial(&self) -> SpatialFilter {
        self.spatial
    }

    pub fn ground_truth(&self) -> bool {
        self.ground_truth
    }

    pub fn temporal(&self) -> bool {
        self.temporal
    }

    pub fn show_noise(&self) -> bool {
        self.show_noise
    }

    pub fn frame_counter(&self) -> u32 {
        self.counter.value()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_asset(&self) -> Option<&VolumeAsset> {
        self.lookup_active()
    }

    pub fn store(&self) -> &VolumeAssetStore {
        &self.store
    }

    pub fn view(&self) -> &SceneView {
        &self.view
    }

    pub fn opts(&self) -> &RenderOpts {
        &self.opts
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Current output as 8-bit RGB.
    pub fn read_frame(&mut self) -> NanoVolumeResult<image::RgbImage> {
        Ok(self.device.read_output()?.to_rgb8())
    }

    /// Release surfaces, noise banks and asset buffers. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        for id in SurfaceId::ALL {
            self.device.release_surface(id);
        }
        self.device.release_noise_banks();
        for asset in self.store.iter_mut() {
            if let Some(handle) = asset.take_buffer() {
                self.device.release_buffer(handle);
            }
        }
        tracing::debug!("render pipeline torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl<D: RenderDevice> Drop for RenderPipeline<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
