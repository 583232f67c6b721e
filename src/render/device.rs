use crate::{
    foundation::core::Canvas,
    foundation::error::NanoVolumeResult,
    render::noise::NoiseBank,
    render::plan::{
        CompositePass, CopyPass, GroundTruthPass, NoisePass, SamplePass, SpatialPass,
        TemporalPass,
    },
};

/// Opaque handle to a device-resident structured buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// The full-resolution float surfaces a pipeline session renders through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    /// Raw stochastic sample.
    NewSample,
    /// Spatially filtered sample.
    SpatialFiltered,
    /// Temporally blended frame.
    FinalFrame,
    /// Last blended frame, carried across ticks.
    History,
    /// Presentation target. Keeps its contents when a tick issues nothing.
    Output,
}

impl SurfaceId {
    pub const ALL: [SurfaceId; 5] = [
        SurfaceId::NewSample,
        SurfaceId::SpatialFiltered,
        SurfaceId::FinalFrame,
        SurfaceId::History,
        SurfaceId::Output,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SurfaceId::NewSample => "new_sample",
            SurfaceId::SpatialFiltered => "spatial_filtered",
            SurfaceId::FinalFrame => "final_frame",
            SurfaceId::History => "frame_history",
            SurfaceId::Output => "output",
        }
    }
}

/// A frame read back from the device as linear `f32` RGBA (unbounded range).
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRGBAF32 {
    pub width: u32,
    pub height: u32,
    /// Row-major pixels, `width * height` entries.
    pub data: Vec<[f32; 4]>,
}

impl FrameRGBAF32 {
    /// Quantize to 8-bit RGB, clamping to `[0, 1]` (alpha is dropped).
    pub fn to_rgb8(&self) -> image::RgbImage {
        let mut out = image::RgbImage::new(self.width, self.height);
        for (dst, src) in out.pixels_mut().zip(self.data.iter()) {
            *dst = image::Rgb([
                unit_to_u8(src[0]),
                unit_to_u8(src[1]),
                unit_to_u8(src[2]),
            ]);
        }
        out
    }
}

fn unit_to_u8(v: f32) -> u8 {
    if !v.is_finite() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Device seam the pipeline renders through.
///
/// A device owns the memory behind buffer handles, surfaces and noise banks. All passes are
/// logically synchronous: a pass observes the results of every pass issued before it.
pub trait RenderDevice {
    /// Create a structured buffer of `element_count` elements of `struct_stride` bytes and fill it
    /// with `words`.
    fn create_structured_buffer(
        &mut self,
        label: &str,
        element_count: u64,
        struct_stride: u64,
        words: &[u32],
    ) -> NanoVolumeResult<BufferHandle>;

    /// Element count of a live buffer, `None` once released.
    fn buffer_len(&self, handle: BufferHandle) -> Option<u64>;

    fn release_buffer(&mut self, handle: BufferHandle);

    /// Allocate (or resize) a surface. Idempotent for an unchanged canvas.
    fn ensure_surface(&mut self, id: SurfaceId, canvas: Canvas) -> NanoVolumeResult<()>;

    fn release_surface(&mut self, id: SurfaceId);

    /// Upload (or replace) the layer bank for `bank.kind()`.
    fn upload_noise_bank(&mut self, bank: &NoiseBank) -> NanoVolumeResult<()>;

    fn release_noise_banks(&mut self);

    fn exec_sample(&mut self, pass: &SamplePass) -> NanoVolumeResult<()>;

    fn exec_ground_truth(&mut self, pass: &GroundTruthPass) -> NanoVolumeResult<()>;

    fn exec_spatial(&mut self, pass: &SpatialPass) -> NanoVolumeResult<()>;

    fn exec_temporal(&mut self, pass: &TemporalPass) -> NanoVolumeResult<()>;

    fn exec_copy(&mut self, pass: &CopyPass) -> NanoVolumeResult<()>;

    fn exec_composite(&mut self, pass: &CompositePass) -> NanoVolumeResult<()>;

    /// Write the noise value each pixel's sample would be offset by (before strength scaling).
    /// Missing stored banks fall back to interleaved gradient noise, as in [`exec_sample`].
    ///
    /// [`exec_sample`]: RenderDevice::exec_sample
    fn exec_noise(&mut self, pass: &NoisePass) -> NanoVolumeResult<()>;

    /// Read back the output surface.
    fn read_output(&mut self) -> NanoVolumeResult<FrameRGBAF32>;
}
