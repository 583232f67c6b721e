use std::collections::HashMap;

use wgpu::util::DeviceExt as _;

use crate::{
    foundation::core::{Canvas, NoiseKind},
    foundation::error::{NanoVolumeError, NanoVolumeResult},
    render::device::{BufferHandle, FrameRGBAF32, RenderDevice, SurfaceId},
    render::filters::kernel_weights,
    render::march::{Camera, lattice_edge},
    render::noise::{FallbackWarnings, NoiseBank},
    render::plan::{
        CompositePass, CopyPass, GroundTruthPass, MarchParams, NoisePass, SamplePass,
        SpatialPass, TemporalPass,
    },
};

const JITTER_FIXED: u32 = 0;
const JITTER_IGN: u32 = 1;
const JITTER_BANK: u32 = 2;
const WORKGROUP: u32 = 8;
const PIXEL_BYTES: u64 = 16;

struct GpuBuffer {
    label: String,
    element_count: u64,
    lattice_edge: u32,
    buffer: wgpu::Buffer,
}

struct GpuSurface {
    canvas: Canvas,
    buffer: wgpu::Buffer,
}

struct GpuNoiseBank {
    size: u32,
    depth: u32,
    buffer: wgpu::Buffer,
}

struct Kernels {
    layout: wgpu::BindGroupLayout,
    march: wgpu::ComputePipeline,
    filter: wgpu::ComputePipeline,
    blend: wgpu::ComputePipeline,
    noise: wgpu::ComputePipeline,
    params: wgpu::Buffer,
    /// Bound to every storage slot a kernel does not read.
    placeholder: wgpu::Buffer,
}

/// Uniform block shared by every kernel. Field order and padding mirror `Params` in
/// `kernels.wgsl`: scalars in groups of four, each vec3 followed by one pad word.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct KernelParams {
    width: u32,
    height: u32,
    frame: u32,
    jitter_mode: u32,
    view_steps: u32,
    light_steps: u32,
    lattice_edge: u32,
    taps: u32,
    noise_size: u32,
    noise_depth: u32,
    filter_axis: u32,
    _pad0: u32,
    density: f32,
    light_ray_length: f32,
    clip_min: f32,
    clip_max: f32,
    half_extent: f32,
    tan_half_fov: f32,
    noise_strength: f32,
    history_weight: f32,
    cam_pos: [f32; 3],
    _pad1: f32,
    cam_fwd: [f32; 3],
    _pad2: f32,
    cam_right: [f32; 3],
    _pad3: f32,
    cam_up: [f32; 3],
    _pad4: f32,
    light_dir: [f32; 3],
    _pad5: f32,
    kernel: [f32; 8],
}

const _: () = assert!(std::mem::size_of::<KernelParams>() == 192);

impl KernelParams {
    fn new(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            ..Self::default()
        }
    }

    fn march(&mut self, march: &MarchParams, lattice_edge: u32) {
        let camera = Camera::new(march);
        self.view_steps = march.view_steps;
        self.light_steps = march.light_steps;
        self.lattice_edge = lattice_edge;
        self.density = march.density;
        self.light_ray_length = march.light_ray_length;
        self.clip_min = march.clip_min;
        self.clip_max = march.clip_max;
        self.half_extent = march.half_extent;
        self.tan_half_fov = camera.tan_half_fov;
        self.cam_pos = camera.origin.to_array();
        self.cam_fwd = camera.forward.to_array();
        self.cam_right = camera.right.to_array();
        self.cam_up = camera.up.to_array();
        self.light_dir = march.light_dir.to_array();
    }

    /// Load separable filter taps; the block holds at most eight.
    fn taps(&mut self, taps: &[f32]) -> NanoVolumeResult<()> {
        let slots = self.kernel.len();
        let Some(dst) = self.kernel.get_mut(..taps.len()) else {
            return Err(NanoVolumeError::device(format!(
                "{} filter taps exceed the {slots} kernel slots",
                taps.len()
            )));
        };
        dst.copy_from_slice(taps);
        self.taps = taps.len() as u32;
        Ok(())
    }
}

/// wgpu compute device. Surfaces and volumes live in storage buffers; every pass is one submit.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    kernels: Kernels,
    next_buffer: u64,
    buffers: HashMap<u64, GpuBuffer>,
    surfaces: HashMap<SurfaceId, GpuSurface>,
    scratch: Option<GpuSurface>,
    noise_banks: HashMap<NoiseKind, GpuNoiseBank>,
    fallback: FallbackWarnings,
}

impl WgpuDevice {
    pub fn new() -> NanoVolumeResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                NanoVolumeError::device("no gpu adapter available")
            }
            other => NanoVolumeError::device(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("nanovolume_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| NanoVolumeError::device(format!("wgpu request_device failed: {e:?}")))?;

        let kernels = build_kernels(&device);
        tracing::info!(adapter = ?adapter.get_info().name, "wgpu device ready");
        Ok(Self {
            device,
            queue,
            kernels,
            next_buffer: 0,
            buffers: HashMap::new(),
            surfaces: HashMap::new(),
            scratch: None,
            noise_banks: HashMap::new(),
            fallback: FallbackWarnings::default(),
        })
    }

    fn surface(&self, id: SurfaceId) -> NanoVolumeResult<&GpuSurface> {
        self.surfaces.get(&id).ok_or_else(|| {
            NanoVolumeError::not_ready(format!("surface '{}' was not allocated", id.label()))
        })
    }

    fn volume(&self, handle: BufferHandle) -> NanoVolumeResult<&GpuBuffer> {
        self.buffers.get(&handle.0).ok_or_else(|| {
            NanoVolumeError::not_ready(format!("volume buffer {} is not live", handle.0))
        })
    }

    fn surface_buffer(&self, canvas: Canvas, label: &str) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (canvas.pixel_count() as u64 * PIXEL_BYTES).max(PIXEL_BYTES),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn dispatch(
        &self,
        pipeline: &wgpu::ComputePipeline,
        params: &KernelParams,
        bindings: Bindings<'_>,
        canvas: Canvas,
    ) {
        self.queue
            .write_buffer(&self.kernels.params, 0, bytemuck::bytes_of(params));
        let ph = &self.kernels.placeholder;
        let entries = [
            wgpu::BindGroupEntry {
                binding: 0,
                resource: self.kernels.params.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: bindings.volume.unwrap_or(ph).as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: bindings.src_a.unwrap_or(ph).as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: bindings.src_b.unwrap_or(ph).as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: bindings.noise.unwrap_or(ph).as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 5,
                resource: bindings.dst.as_entire_binding(),
            },
        ];
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("nanovolume_pass_bg"),
            layout: &self.kernels.layout,
            entries: &entries,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nanovolume_pass_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("nanovolume_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                canvas.width.div_ceil(WORKGROUP),
                canvas.height.div_ceil(WORKGROUP),
                1,
            );
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn march_into(
        &self,
        volume: BufferHandle,
        target: SurfaceId,
        march: &MarchParams,
        jitter: Jitter,
    ) -> NanoVolumeResult<()> {
        let vol = self.volume(volume)?;
        let dst = self.surface(target)?;
        let mut params = KernelParams::new(dst.canvas);
        params.march(march, vol.lattice_edge);
        let noise = self.bind_jitter(jitter, &mut params)?;
        self.dispatch(
            &self.kernels.march,
            &params,
            Bindings {
                volume: Some(&vol.buffer),
                noise,
                ..Bindings::to(&dst.buffer)
            },
            dst.canvas,
        );
        Ok(())
    }

    /// Jitter source for a stochastic pass. A stored kind without an uploaded bank falls back to
    /// interleaved gradient noise, warned once per kind.
    fn stochastic_jitter(&mut self, kind: NoiseKind, frame: u32, strength: f32) -> Jitter {
        if kind.is_stored() {
            if self.noise_banks.contains_key(&kind) {
                return Jitter::Bank {
                    kind,
                    frame,
                    strength,
                };
            }
            self.fallback.missing(kind);
        }
        Jitter::Ign { frame, strength }
    }

    /// Fill the jitter fields of `params`, returning the bank buffer to bind.
    fn bind_jitter(
        &self,
        jitter: Jitter,
        params: &mut KernelParams,
    ) -> NanoVolumeResult<Option<&wgpu::Buffer>> {
        match jitter {
            Jitter::Fixed => {
                params.jitter_mode = JITTER_FIXED;
                Ok(None)
            }
            Jitter::Ign { frame, strength } => {
                params.jitter_mode = JITTER_IGN;
                params.frame = frame;
                params.noise_strength = strength;
                Ok(None)
            }
            Jitter::Bank {
                kind,
                frame,
                strength,
            } => {
                let bank = self.noise_banks.get(&kind).ok_or_else(|| {
                    NanoVolumeError::not_ready(format!("noise bank '{}' missing", kind.name()))
                })?;
                params.jitter_mode = JITTER_BANK;
                params.frame = frame;
                params.noise_strength = strength;
                params.noise_size = bank.size;
                params.noise_depth = bank.depth;
                Ok(Some(&bank.buffer))
            }
        }
    }

    fn copy_surface(&self, src: SurfaceId, dst: SurfaceId) -> NanoVolumeResult<()> {
        let s = self.surface(src)?;
        let d = self.surface(dst)?;
        if s.canvas != d.canvas {
            return Err(NanoVolumeError::device(format!(
                "copy '{}' -> '{}' between differently sized surfaces",
                src.label(),
                dst.label()
            )));
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nanovolume_copy_encoder"),
            });
        encoder.copy_buffer_to_buffer(&s.buffer, 0, &d.buffer, 0, s.buffer.size());
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }
}

enum Jitter {
    Fixed,
    Ign { frame: u32, strength: f32 },
    Bank { kind: NoiseKind, frame: u32, strength: f32 },
}

struct Bindings<'a> {
    volume: Option<&'a wgpu::Buffer>,
    src_a: Option<&'a wgpu::Buffer>,
    src_b: Option<&'a wgpu::Buffer>,
    noise: Option<&'a wgpu::Buffer>,
    dst: &'a wgpu::Buffer,
}

impl<'a> Bindings<'a> {
    fn to(dst: &'a wgpu::Buffer) -> Self {
        Self {
            volume: None,
            src_a: None,
            src_b: None,
            noise: None,
            dst,
        }
    }
}

impl RenderDevice for WgpuDevice {
    fn create_structured_buffer(
        &mut self,
        label: &str,
        element_count: u64,
        struct_stride: u64,
        words: &[u32],
    ) -> NanoVolumeResult<BufferHandle> {
        if struct_stride != 4 {
            return Err(NanoVolumeError::device(format!(
                "gpu volume buffers hold 32-bit words, got stride {struct_stride}"
            )));
        }
        if words.len() as u64 != element_count {
            return Err(NanoVolumeError::device(format!(
                "buffer '{label}' declares {element_count} elements but {} were supplied",
                words.len()
            )));
        }
        let limit = self.device.limits().max_storage_buffer_binding_size as u64;
        if element_count * struct_stride > limit {
            return Err(NanoVolumeError::device(format!(
                "buffer '{label}' ({} bytes) exceeds the storage binding limit ({limit} bytes)",
                element_count * struct_stride
            )));
        }
        // Storage bindings may not be empty.
        let padded;
        let contents: &[u32] = if words.is_empty() {
            padded = [0u32; 4];
            &padded
        } else {
            words
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(contents),
                usage: wgpu::BufferUsages::STORAGE,
            });
        self.next_buffer += 1;
        let id = self.next_buffer;
        self.buffers.insert(
            id,
            GpuBuffer {
                label: label.to_string(),
                element_count,
                lattice_edge: lattice_edge(words.len()) as u32,
                buffer,
            },
        );
        tracing::debug!(label, element_count, id, "created gpu structured buffer");
        Ok(BufferHandle(id))
    }

    fn buffer_len(&self, handle: BufferHandle) -> Option<u64> {
        self.buffers.get(&handle.0).map(|b| b.element_count)
    }

    fn release_buffer(&mut self, handle: BufferHandle) {
        if let Some(b) = self.buffers.remove(&handle.0) {
            b.buffer.destroy();
            tracing::debug!(label = %b.label, id = handle.0, "released gpu structured buffer");
        }
    }

    fn ensure_surface(&mut self, id: SurfaceId, canvas: Canvas) -> NanoVolumeResult<()> {
        if self.surfaces.get(&id).is_some_and(|s| s.canvas == canvas) {
            return Ok(());
        }
        let buffer = self.surface_buffer(canvas, id.label());
        if let Some(old) = self.surfaces.insert(id, GpuSurface { canvas, buffer }) {
            old.buffer.destroy();
        }
        Ok(())
    }

    fn release_surface(&mut self, id: SurfaceId) {
        if let Some(s) = self.surfaces.remove(&id) {
            s.buffer.destroy();
        }
        if self.surfaces.is_empty()
            && let Some(s) = self.scratch.take()
        {
            s.buffer.destroy();
        }
    }

    fn upload_noise_bank(&mut self, bank: &NoiseBank) -> NanoVolumeResult<()> {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(bank.kind().name()),
                contents: bytemuck::cast_slice(bank.values()),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let uploaded = GpuNoiseBank {
            size: bank.size(),
            depth: bank.depth(),
            buffer,
        };
        if let Some(old) = self.noise_banks.insert(bank.kind(), uploaded) {
            old.buffer.destroy();
        }
        self.fallback.uploaded(bank.kind());
        Ok(())
    }

    fn release_noise_banks(&mut self) {
        for (_, bank) in self.noise_banks.drain() {
            bank.buffer.destroy();
        }
        self.fallback.clear();
    }

    fn exec_sample(&mut self, pass: &SamplePass) -> NanoVolumeResult<()> {
        let jitter = self.stochastic_jitter(pass.noise, pass.frame, pass.noise_strength);
        self.march_into(pass.volume, pass.target, &pass.march, jitter)
    }

    fn exec_ground_truth(&mut self, pass: &GroundTruthPass) -> NanoVolumeResult<()> {
        self.march_into(pass.volume, pass.target, &pass.march, Jitter::Fixed)
    }

    fn exec_spatial(&mut self, pass: &SpatialPass) -> NanoVolumeResult<()> {
        if pass.input == pass.output {
            return Err(NanoVolumeError::device(
                "spatial filter cannot run in place",
            ));
        }
        let canvas = self.surface(pass.output)?.canvas;
        if self.surface(pass.input)?.canvas != canvas {
            return Err(NanoVolumeError::device(
                "spatial filter surfaces differ in size",
            ));
        }
        if self.scratch.as_ref().is_none_or(|s| s.canvas != canvas) {
            let buffer = self.surface_buffer(canvas, "spatial_scratch");
            if let Some(old) = self.scratch.replace(GpuSurface { canvas, buffer }) {
                old.buffer.destroy();
            }
        }

        let taps = kernel_weights(pass.filter);
        let mut params = KernelParams::new(canvas);
        params.taps(&taps)?;

        let src = &self.surface(pass.input)?.buffer;
        let dst = &self.surface(pass.output)?.buffer;
        let scratch = self
            .scratch
            .as_ref()
            .map(|s| &s.buffer)
            .ok_or_else(|| NanoVolumeError::device("spatial scratch surface missing"))?;

        params.filter_axis = 0;
        self.dispatch(
            &self.kernels.filter,
            &params,
            Bindings {
                src_a: Some(src),
                ..Bindings::to(scratch)
            },
            canvas,
        );
        params.filter_axis = 1;
        self.dispatch(
            &self.kernels.filter,
            &params,
            Bindings {
                src_a: Some(scratch),
                ..Bindings::to(dst)
            },
            canvas,
        );
        Ok(())
    }

    fn exec_temporal(&mut self, pass: &TemporalPass) -> NanoVolumeResult<()> {
        if pass.output == pass.sample || pass.output == pass.history {
            return Err(NanoVolumeError::device(
                "temporal blend output must differ from its inputs",
            ));
        }
        let w = pass.history_weight;
        if !w.is_finite() || !(0.0..1.0).contains(&w) {
            return Err(NanoVolumeError::validation(
                "history weight must be in [0, 1)",
            ));
        }
        let sample = self.surface(pass.sample)?;
        let history = self.surface(pass.history)?;
        let out = self.surface(pass.output)?;
        if sample.canvas != out.canvas || history.canvas != out.canvas {
            return Err(NanoVolumeError::device(
                "temporal blend surfaces differ in size",
            ));
        }
        let mut params = KernelParams::new(out.canvas);
        params.history_weight = w;
        self.dispatch(
            &self.kernels.blend,
            &params,
            Bindings {
                src_a: Some(&sample.buffer),
                src_b: Some(&history.buffer),
                ..Bindings::to(&out.buffer)
            },
            out.canvas,
        );
        Ok(())
    }

    fn exec_copy(&mut self, pass: &CopyPass) -> NanoVolumeResult<()> {
        self.copy_surface(pass.src, pass.dst)
    }

    fn exec_composite(&mut self, pass: &CompositePass) -> NanoVolumeResult<()> {
        self.copy_surface(pass.src, SurfaceId::Output)
    }

    fn exec_noise(&mut self, pass: &NoisePass) -> NanoVolumeResult<()> {
        let jitter = self.stochastic_jitter(pass.noise, pass.frame, 1.0);
        let dst = self.surface(pass.target)?;
        let mut params = KernelParams::new(dst.canvas);
        let noise = self.bind_jitter(jitter, &mut params)?;
        self.dispatch(
            &self.kernels.noise,
            &params,
            Bindings {
                noise,
                ..Bindings::to(&dst.buffer)
            },
            dst.canvas,
        );
        Ok(())
    }

    fn read_output(&mut self) -> NanoVolumeResult<FrameRGBAF32> {
        let out = self.surface(SurfaceId::Output)?;
        let size = out.buffer.size();
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("nanovolume_readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nanovolume_readback_encoder"),
            });
        encoder.copy_buffer_to_buffer(&out.buffer, 0, &readback, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| NanoVolumeError::device(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| NanoVolumeError::device("readback channel closed"))?
            .map_err(|e| NanoVolumeError::device(format!("readback map failed: {e:?}")))?;

        let mapped = slice.get_mapped_range();
        let floats = bytemuck::pod_collect_to_vec::<u8, f32>(&mapped);
        drop(mapped);
        readback.unmap();

        let data = floats
            .chunks_exact(4)
            .take(out.canvas.pixel_count())
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();
        Ok(FrameRGBAF32 {
            width: out.canvas.width,
            height: out.canvas.height,
            data,
        })
    }
}

fn build_kernels(device: &wgpu::Device) -> Kernels {
    let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("nanovolume_kernels_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            storage(1, true),
            storage(2, true),
            storage(3, true),
            storage(4, true),
            storage(5, false),
        ],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("nanovolume_kernels"),
        source: wgpu::ShaderSource::Wgsl(include_str!("kernels.wgsl").into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("nanovolume_kernels_pl"),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });
    let pipeline = |entry: &str| {
        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(entry),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(entry),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        })
    };

    let params = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("nanovolume_kernel_params"),
        size: std::mem::size_of::<KernelParams>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let placeholder = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("nanovolume_placeholder"),
        size: PIXEL_BYTES,
        usage: wgpu::BufferUsages::STORAGE,
        mapped_at_creation: false,
    });

    Kernels {
        march: pipeline("march_main"),
        filter: pipeline("filter_main"),
        blend: pipeline("blend_main"),
        noise: pipeline("noise_main"),
        layout,
        params,
        placeholder,
    }
}
