use crate::{
    foundation::core::{Canvas, NoiseKind, SpatialFilter, Vec3},
    foundation::error::NanoVolumeResult,
    render::device::{BufferHandle, RenderDevice, SurfaceId},
};

/// Camera and lighting inputs shared by both march passes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarchParams {
    pub density: f32,
    pub light_steps: u32,
    pub light_ray_length: f32,
    pub view_steps: u32,
    pub clip_min: f32,
    pub clip_max: f32,
    pub half_extent: f32,
    /// Direction the sunlight travels (normalized).
    pub light_dir: Vec3,
    pub camera_position: Vec3,
    /// Camera euler rotation in degrees.
    pub camera_rotation: Vec3,
    pub fov_y_deg: f32,
}

/// Stochastic ray march into `target`.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplePass {
    pub volume: BufferHandle,
    pub target: SurfaceId,
    pub march: MarchParams,
    pub noise: NoiseKind,
    pub noise_strength: f32,
    pub frame: u32,
}

/// Noise-free reference march written straight into the output surface.
#[derive(Clone, Debug, PartialEq)]
pub struct GroundTruthPass {
    pub volume: BufferHandle,
    pub target: SurfaceId,
    pub march: MarchParams,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpatialPass {
    pub input: SurfaceId,
    pub output: SurfaceId,
    pub filter: SpatialFilter,
}

/// `output = lerp(sample, history, history_weight)`.
#[derive(Clone, Debug, PartialEq)]
pub struct TemporalPass {
    pub sample: SurfaceId,
    pub history: SurfaceId,
    pub output: SurfaceId,
    pub history_weight: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CopyPass {
    pub src: SurfaceId,
    pub dst: SurfaceId,
}

/// Active noise layer for `frame`, written as grey with opaque alpha. Bypasses the filters.
#[derive(Clone, Debug, PartialEq)]
pub struct NoisePass {
    pub target: SurfaceId,
    pub noise: NoiseKind,
    pub frame: u32,
}

/// Present `src` on the output surface.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositePass {
    pub src: SurfaceId,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Pass {
    Sample(SamplePass),
    GroundTruth(GroundTruthPass),
    Spatial(SpatialPass),
    Temporal(TemporalPass),
    Copy(CopyPass),
    Composite(CompositePass),
    Noise(NoisePass),
}

/// Ordered passes for one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct FramePlan {
    pub canvas: Canvas,
    pub passes: Vec<Pass>,
}

impl FramePlan {
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Whether any pass writes `id`.
    pub fn writes(&self, id: SurfaceId) -> bool {
        self.passes.iter().any(|p| match p {
            Pass::Sample(s) => s.target == id,
            Pass::GroundTruth(g) => g.target == id,
            Pass::Spatial(s) => s.output == id,
            Pass::Temporal(t) => t.output == id,
            Pass::Copy(c) => c.dst == id,
            Pass::Composite(_) => id == SurfaceId::Output,
            Pass::Noise(n) => n.target == id,
        })
    }
}

/// Issue every pass of `plan` in order. Stops at the first failing pass, so later passes (the
/// history copy in particular) never run on top of a failed one.
pub fn execute_plan<D: RenderDevice + ?Sized>(
    device: &mut D,
    plan: &FramePlan,
) -> NanoVolumeResult<()> {
    for pass in &plan.passes {
        match pass {
            Pass::Sample(p) => device.exec_sample(p)?,
            Pass::GroundTruth(p) => device.exec_ground_truth(p)?,
            Pass::Spatial(p) => device.exec_spatial(p)?,
            Pass::Temporal(p) => device.exec_temporal(p)?,
            Pass::Copy(p) => device.exec_copy(p)?,
            Pass::Composite(p) => device.exec_composite(p)?,
            Pass::Noise(p) => device.exec_noise(p)?,
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/plan.rs"]
mod tests;
