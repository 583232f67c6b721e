//! nanovolume renders sparse NanoVDB density volumes by ray marching a device-resident buffer.
//!
//! # Pipeline overview
//!
//! 1. **Load**: `.nvdb` container -> [`DecodedVolume`] -> device structured buffer bound to a
//!    [`VolumeAsset`] ([`VolumeLoader`])
//! 2. **Render**: one [`RenderPipeline::advance`] per frame builds a [`FramePlan`] (sample, spatial
//!    filter, EMA blend, history copy, composite; or a single ground-truth march) and runs it on a
//!    [`RenderDevice`]
//! 3. **Capture** (optional): [`ExperimentCapture`] accumulates a fixed number of output frames,
//!    saves them with one ground-truth frame and a sidecar, and scores them with [`rmse`]
//!
//! The CPU reference device ([`CpuDevice`]) is always available; a wgpu device is built with the
//! `gpu` feature.
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Explicit randomness**: noise banks are generated from a caller-seeded [`Pcg32`].
//! - **Frame-synchronous**: per-frame entry points take `&mut self` and never return errors; they
//!   log and report a degraded outcome instead.
#![forbid(unsafe_code)]

mod assets;
mod experiment;
mod foundation;
mod render;

pub use assets::decode::{DecodedVolume, NanoVdbDecoder, VolumeDecoder, decode_nvdb, encode_nvdb};
pub use assets::loader::{LoadReport, VolumeLoader};
pub use assets::manifest::{AssetSpec, VolumeManifest};
pub use assets::store::{VolumeAsset, VolumeAssetStore, wrap_index};
pub use experiment::capture::{
    CaptureDescriptor, CaptureOpts, CaptureReport, CaptureTarget, CaptureTick, ExperimentCapture,
    ExperimentRun, GroundTruthGuard,
};
pub use experiment::metrics::{Channels, rmse, rmse_or_sentinel};
pub use experiment::sidecar::SidecarRecord;
pub use experiment::snapshot::{SnapshotReport, save_snapshot};
pub use foundation::core::{Canvas, FrameCounter, NoiseKind, SpatialFilter, Vec3, volume_stem};
pub use foundation::error::{NanoVolumeError, NanoVolumeResult};
pub use foundation::rng::Pcg32;
pub use render::backend::{DeviceKind, create_device};
pub use render::cpu::CpuDevice;
pub use render::device::{BufferHandle, FrameRGBAF32, RenderDevice, SurfaceId};
pub use render::filters::{apply_spatial_filter, blend_ema, kernel_weights};
#[cfg(feature = "gpu")]
pub use render::gpu::WgpuDevice;
pub use render::march::{Lattice, march_image, march_pixel};
pub use render::noise::{NoiseBank, interleaved_gradient_noise};
pub use render::opts::{RenderOpts, SceneView, TemporalOpts};
pub use render::pipeline::{FrameTimer, PipelineState, RenderPipeline, TickReport};
pub use render::plan::{
    CompositePass, CopyPass, FramePlan, GroundTruthPass, MarchParams, NoisePass, Pass,
    SamplePass, SpatialPass, TemporalPass, execute_plan,
};
