use crate::{
    foundation::core::Canvas,
    foundation::error::{NanoVolumeError, NanoVolumeResult},
    render::device::{BufferHandle, FrameRGBAF32, RenderDevice, SurfaceId},
    render::noise::NoiseBank,
    render::plan::{
        CompositePass, CopyPass, GroundTruthPass, NoisePass, SamplePass, SpatialPass,
        TemporalPass,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    Cpu,
    #[cfg(feature = "gpu")]
    Gpu,
}

impl DeviceKind {
    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Cpu => "cpu",
            #[cfg(feature = "gpu")]
            DeviceKind::Gpu => "gpu",
        }
    }
}

pub fn create_device(kind: DeviceKind) -> NanoVolumeResult<Box<dyn RenderDevice>> {
    match kind {
        DeviceKind::Cpu => Ok(Box::new(crate::render::cpu::CpuDevice::new())),
        #[cfg(feature = "gpu")]
        DeviceKind::Gpu => Ok(Box::new(crate::render::gpu::WgpuDevice::new()?)),
        #[allow(unreachable_patterns)]
        _ => Err(NanoVolumeError::device("requested device is not available")),
    }
}

impl<D: RenderDevice + ?Sized> RenderDevice for Box<D> {
    fn create_structured_buffer(
        &mut self,
        label: &str,
        element_count: u64,
        struct_stride: u64,
        words: &[u32],
    ) -> NanoVolumeResult<BufferHandle> {
        (**self).create_structured_buffer(label, element_count, struct_stride, words)
    }

    fn buffer_len(&self, handle: BufferHandle) -> Option<u64> {
        (**self).buffer_len(handle)
    }

    fn release_buffer(&mut self, handle: BufferHandle) {
        (**self).release_buffer(handle)
    }

    fn ensure_surface(&mut self, id: SurfaceId, canvas: Canvas) -> NanoVolumeResult<()> {
        (**self).ensure_surface(id, canvas)
    }

    fn release_surface(&mut self, id: SurfaceId) {
        (**self).release_surface(id)
    }

    fn upload_noise_bank(&mut self, bank: &NoiseBank) -> NanoVolumeResult<()> {
        (**self).upload_noise_bank(bank)
    }

    fn release_noise_banks(&mut self) {
        (**self).release_noise_banks()
    }

    fn exec_sample(&mut self, pass: &SamplePass) -> NanoVolumeResult<()> {
        (**self).exec_sample(pass)
    }

    fn exec_ground_truth(&mut self, pass: &GroundTruthPass) -> NanoVolumeResult<()> {
        (**self).exec_ground_truth(pass)
    }

    fn exec_spatial(&mut self, pass: &SpatialPass) -> NanoVolumeResult<()> {
        (**self).exec_spatial(pass)
    }

    fn exec_temporal(&mut self, pass: &TemporalPass) -> NanoVolumeResult<()> {
        (**self).exec_temporal(pass)
    }

    fn exec_copy(&mut self, pass: &CopyPass) -> NanoVolumeResult<()> {
        (**self).exec_copy(pass)
    }

    fn exec_composite(&mut self, pass: &CompositePass) -> NanoVolumeResult<()> {
        (**self).exec_composite(pass)
    }

    fn exec_noise(&mut self, pass: &NoisePass) -> NanoVolumeResult<()> {
        (**self).exec_noise(pass)
    }

    fn read_output(&mut self) -> NanoVolumeResult<FrameRGBAF32> {
        (**self).read_output()
    }
}
