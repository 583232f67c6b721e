use std::collections::HashMap;

use rayon::prelude::*;

use crate::{
    foundation::core::{Canvas, NoiseKind},
    foundation::error::{NanoVolumeError, NanoVolumeResult},
    render::device::{BufferHandle, FrameRGBAF32, RenderDevice, SurfaceId},
    render::filters::{apply_spatial_filter, blend_ema},
    render::march::{Lattice, march_image},
    render::noise::{FallbackWarnings, NoiseBank, noise_at},
    render::plan::{
        CompositePass, CopyPass, GroundTruthPass, MarchParams, NoisePass, SamplePass,
        SpatialPass, TemporalPass,
    },
};

/// Reference device: host-memory buffers and `f32` RGBA surfaces, rayon inside each pass.
#[derive(Default)]
pub struct CpuDevice {
    next_buffer: u64,
    buffers: HashMap<u64, CpuBuffer>,
    surfaces: HashMap<SurfaceId, CpuSurface>,
    noise_banks: HashMap<NoiseKind, NoiseBank>,
    fallback: FallbackWarnings,
}

struct CpuBuffer {
    label: String,
    element_count: u64,
    words: Vec<u32>,
}

struct CpuSurface {
    canvas: Canvas,
    data: Vec<[f32; 4]>,
}

impl CpuSurface {
    fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            data: vec![[0.0; 4]; canvas.pixel_count()],
        }
    }
}

impl CpuDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pixels of a live surface.
    pub fn surface_data(&self, id: SurfaceId) -> Option<&[[f32; 4]]> {
        self.surfaces.get(&id).map(|s| s.data.as_slice())
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn noise_bank(&self, kind: NoiseKind) -> Option<&NoiseBank> {
        self.noise_banks.get(&kind)
    }

    fn buffer_words(&self, handle: BufferHandle) -> NanoVolumeResult<&[u32]> {
        self.buffers
            .get(&handle.0)
            .map(|b| b.words.as_slice())
            .ok_or_else(|| {
                NanoVolumeError::not_ready(format!("volume buffer {} is not live", handle.0))
            })
    }

    fn take_surface(&mut self, id: SurfaceId) -> NanoVolumeResult<CpuSurface> {
        self.surfaces.remove(&id).ok_or_else(|| {
            NanoVolumeError::not_ready(format!("surface '{}' was not allocated", id.label()))
        })
    }

    fn surface(&self, id: SurfaceId) -> NanoVolumeResult<&CpuSurface> {
        self.surfaces.get(&id).ok_or_else(|| {
            NanoVolumeError::not_ready(format!("surface '{}' was not allocated", id.label()))
        })
    }

    fn march_into(
        &mut self,
        volume: BufferHandle,
        target: SurfaceId,
        march: &MarchParams,
        jitter: impl Fn(u32, u32) -> f32 + Sync,
    ) -> NanoVolumeResult<()> {
        let mut dst = self.take_surface(target)?;
        let result = self.buffer_words(volume).map(|words| {
            let lattice = Lattice::new(words);
            march_image(&lattice, march, dst.canvas, jitter, &mut dst.data);
        });
        self.surfaces.insert(target, dst);
        result
    }

    /// Take the bank for `kind` out of the device for the duration of a pass. `None` means the
    /// pass uses interleaved gradient noise.
    fn take_noise(&mut self, kind: NoiseKind) -> Option<NoiseBank> {
        if !kind.is_stored() {
            return None;
        }
        let bank = self.noise_banks.remove(&kind);
        if bank.is_none() {
            self.fallback.missing(kind);
        }
        bank
    }
}

impl RenderDevice for CpuDevice {
    fn create_structured_buffer(
        &mut self,
        label: &str,
        element_count: u64,
        struct_stride: u64,
        words: &[u32],
    ) -> NanoVolumeResult<BufferHandle> {
        if struct_stride != 4 {
            return Err(NanoVolumeError::device(format!(
                "cpu buffers hold 32-bit words, got stride {struct_stride}"
            )));
        }
        if words.len() as u64 != element_count {
            return Err(NanoVolumeError::device(format!(
                "buffer '{label}' declares {element_count} elements but {} were supplied",
                words.len()
            )));
        }
        self.next_buffer += 1;
        let id = self.next_buffer;
        self.buffers.insert(
            id,
            CpuBuffer {
                label: label.to_string(),
                element_count,
                words: words.to_vec(),
            },
        );
        tracing::debug!(label, element_count, id, "created structured buffer");
        Ok(BufferHandle(id))
    }

    fn buffer_len(&self, handle: BufferHandle) -> Option<u64> {
        self.buffers.get(&handle.0).map(|b| b.element_count)
    }

    fn release_buffer(&mut self, handle: BufferHandle) {
        if let Some(b) = self.buffers.remove(&handle.0) {
            tracing::debug!(label = %b.label, id = handle.0, "released structured buffer");
        }
    }

    fn ensure_surface(&mut self, id: SurfaceId, canvas: Canvas) -> NanoVolumeResult<()> {
        match self.surfaces.get_mut(&id) {
            Some(surface) if surface.canvas == canvas => {}
            Some(surface) => *surface = CpuSurface::new(canvas),
            None => {
                self.surfaces.insert(id, CpuSurface::new(canvas));
            }
        }
        Ok(())
    }

    fn release_surface(&mut self, id: SurfaceId) {
        self.surfaces.remove(&id);
    }

    fn upload_noise_bank(&mut self, bank: &NoiseBank) -> NanoVolumeResult<()> {
        self.fallback.uploaded(bank.kind());
        self.noise_banks.insert(bank.kind(), bank.clone());
        Ok(())
    }

    fn release_noise_banks(&mut self) {
        self.noise_banks.clear();
        self.fallback.clear();
    }

    fn exec_sample(&mut self, pass: &SamplePass) -> NanoVolumeResult<()> {
        let strength = pass.noise_strength;
        let frame = pass.frame;
        let bank = self.take_noise(pass.noise);
        let result = self.march_into(pass.volume, pass.target, &pass.march, |x, y| {
            noise_at(bank.as_ref(), x, y, frame) * strength
        });
        if let Some(bank) = bank {
            self.noise_banks.insert(bank.kind(), bank);
        }
        result
    }

    fn exec_ground_truth(&mut self, pass: &GroundTruthPass) -> NanoVolumeResult<()> {
        self.march_into(pass.volume, pass.target, &pass.march, |_, _| 0.5)
    }

    fn exec_spatial(&mut self, pass: &SpatialPass) -> NanoVolumeResult<()> {
        if pass.input == pass.output {
            return Err(NanoVolumeError::device(
                "spatial filter cannot run in place",
            ));
        }
        let mut dst = self.take_surface(pass.output)?;
        let result = self
            .surface(pass.input)
            .and_then(|src| apply_spatial_filter(&src.data, &mut dst.data, dst.canvas, pass.filter));
        self.surfaces.insert(pass.output, dst);
        result
    }

    fn exec_temporal(&mut self, pass: &TemporalPass) -> NanoVolumeResult<()> {
        if pass.output == pass.sample || pass.output == pass.history {
            return Err(NanoVolumeError::device(
                "temporal blend output must differ from its inputs",
            ));
        }
        let mut dst = self.take_surface(pass.output)?;
        let result = self.surface(pass.sample).and_then(|sample| {
            let history = self.surface(pass.history)?;
            blend_ema(&sample.data, &history.data, &mut dst.data, pass.history_weight)
        });
        self.surfaces.insert(pass.output, dst);
        result
    }

    fn exec_copy(&mut self, pass: &CopyPass) -> NanoVolumeResult<()> {
        let data = self.surface(pass.src)?.data.clone();
        let dst = self.surfaces.get_mut(&pass.dst).ok_or_else(|| {
            NanoVolumeError::not_ready(format!("surface '{}' was not allocated", pass.dst.label()))
        })?;
        if dst.data.len() != data.len() {
            return Err(NanoVolumeError::device(format!(
                "copy '{}' -> '{}' between differently sized surfaces",
                pass.src.label(),
                pass.dst.label()
            )));
        }
        dst.data = data;
        Ok(())
    }

    fn exec_composite(&mut self, pass: &CompositePass) -> NanoVolumeResult<()> {
        self.exec_copy(&CopyPass {
            src: pass.src,
            dst: SurfaceId::Output,
        })
    }

    fn exec_noise(&mut self, pass: &NoisePass) -> NanoVolumeResult<()> {
        let frame = pass.frame;
        let bank = self.take_noise(pass.noise);
        let result = self.take_surface(pass.target).map(|mut dst| {
            let width = dst.canvas.width as usize;
            dst.data
                .par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, px) in row.iter_mut().enumerate() {
                        let v = noise_at(bank.as_ref(), x as u32, y as u32, frame);
                        *px = [v, v, v, 1.0];
                    }
                });
            dst
        });
        if let Some(bank) = bank {
            self.noise_banks.insert(bank.kind(), bank);
        }
        self.surfaces.insert(pass.target, result?);
        Ok(())
    }

    fn read_output(&mut self) -> NanoVolumeResult<FrameRGBAF32> {
        let s = self.surface(SurfaceId::Output)?;
        Ok(FrameRGBAF32 {
            width: s.canvas.width,
            height: s.canvas.height,
            data: s.data.clone(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
