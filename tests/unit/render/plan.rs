use super::*;
use crate::{
    foundation::core::Canvas,
    foundation::error::NanoVolumeError,
    render::device::FrameRGBAF32,
    render::noise::NoiseBank,
};

#[derive(Default)]
struct MockDevice {
    calls: Vec<&'static str>,
    fail_on: Option<&'static str>,
}

impl MockDevice {
    fn record(&mut self, name: &'static str) -> NanoVolumeResult<()> {
        self.calls.push(name);
        if self.fail_on == Some(name) {
            return Err(NanoVolumeError::device(format!("{name} failed")));
        }
        Ok(())
    }
}

impl RenderDevice for MockDevice {
    fn create_structured_buffer(
        &mut self,
        _label: &str,
        _element_count: u64,
        _struct_stride: u64,
        _words: &[u32],
    ) -> NanoVolumeResult<BufferHandle> {
        Ok(BufferHandle(1))
    }

    fn buffer_len(&self, _handle: BufferHandle) -> Option<u64> {
        None
    }

    fn release_buffer(&mut self, _handle: BufferHandle) {}

    fn ensure_surface(&mut self, _id: SurfaceId, _canvas: Canvas) -> NanoVolumeResult<()> {
        Ok(())
    }

    fn release_surface(&mut self, _id: SurfaceId) {}

    fn upload_noise_bank(&mut self, _bank: &NoiseBank) -> NanoVolumeResult<()> {
        Ok(())
    }

    fn release_noise_banks(&mut self) {}

    fn exec_sample(&mut self, _pass: &SamplePass) -> NanoVolumeResult<()> {
        self.record("sample")
    }

    fn exec_ground_truth(&mut self, _pass: &GroundTruthPass) -> NanoVolumeResult<()> {
        self.record("ground_truth")
    }

    fn exec_spatial(&mut self, _pass: &SpatialPass) -> NanoVolumeResult<()> {
        self.record("spatial")
    }

    fn exec_temporal(&mut self, _pass: &TemporalPass) -> NanoVolumeResult<()> {
        self.record("temporal")
    }

    fn exec_copy(&mut self, _pass: &CopyPass) -> NanoVolumeResult<()> {
        self.record("copy")
    }

    fn exec_composite(&mut self, _pass: &CompositePass) -> NanoVolumeResult<()> {
        self.record("composite")
    }

    fn exec_noise(&mut self, _pass: &NoisePass) -> NanoVolumeResult<()> {
        self.record("noise")
    }

    fn read_output(&mut self) -> NanoVolumeResult<FrameRGBAF32> {
        Ok(FrameRGBAF32 {
            width: 1,
            height: 1,
            data: vec![[0.0; 4]],
        })
    }
}

fn march() -> MarchParams {
    MarchParams {
        density: 1.0,
        light_steps: 4,
        light_ray_length: 0.5,
        view_steps: 8,
        clip_min: 0.01,
        clip_max: 100.0,
        half_extent: 1.0,
        light_dir: Vec3::new(0.0, -1.0, 0.0),
        camera_position: Vec3::new(0.0, 0.0, -3.0),
        camera_rotation: Vec3::ZERO,
        fov_y_deg: 60.0,
    }
}

fn temporal_plan() -> FramePlan {
    FramePlan {
        canvas: Canvas::new(4, 3).unwrap(),
        passes: vec![
            Pass::Sample(SamplePass {
                volume: BufferHandle(1),
                target: SurfaceId::NewSample,
                march: march(),
                noise: NoiseKind::White,
                noise_strength: 1.0,
                frame: 0,
            }),
            Pass::Spatial(SpatialPass {
                input: SurfaceId::NewSample,
                output: SurfaceId::SpatialFiltered,
                filter: SpatialFilter::Box3x3,
            }),
            Pass::Temporal(TemporalPass {
                sample: SurfaceId::SpatialFiltered,
                history: SurfaceId::History,
                output: SurfaceId::FinalFrame,
                history_weight: 0.9,
            }),
            Pass::Copy(CopyPass {
                src: SurfaceId::FinalFrame,
                dst: SurfaceId::History,
            }),
            Pass::Composite(CompositePass {
                src: SurfaceId::FinalFrame,
            }),
        ],
    }
}

#[test]
fn execute_plan_calls_in_expected_order() {
    let mut device = MockDevice::default();
    execute_plan(&mut device, &temporal_plan()).unwrap();
    assert_eq!(
        device.calls,
        vec!["sample", "spatial", "temporal", "copy", "composite"]
    );
}

#[test]
fn failed_blend_never_reaches_history_copy() {
    let mut device = MockDevice {
        fail_on: Some("temporal"),
        ..MockDevice::default()
    };
    let err = execute_plan(&mut device, &temporal_plan()).unwrap_err();
    assert!(err.to_string().contains("temporal failed"));
    assert_eq!(device.calls, vec!["sample", "spatial", "temporal"]);
}

#[test]
fn writes_reports_targets() {
    let plan = temporal_plan();
    assert!(plan.writes(SurfaceId::History));
    assert!(plan.writes(SurfaceId::Output));

    let gt = FramePlan {
        canvas: plan.canvas,
        passes: vec![Pass::GroundTruth(GroundTruthPass {
            volume: BufferHandle(1),
            target: SurfaceId::Output,
            march: march(),
        })],
    };
    assert!(!gt.writes(SurfaceId::History));
    assert!(gt.writes(SurfaceId::Output));
}

#[test]
fn noise_plan_writes_only_its_target() {
    let plan = FramePlan {
        canvas: Canvas::new(4, 3).unwrap(),
        passes: vec![Pass::Noise(NoisePass {
            target: SurfaceId::Output,
            noise: NoiseKind::Ign,
            frame: 3,
        })],
    };
    assert!(plan.writes(SurfaceId::Output));
    assert!(!plan.writes(SurfaceId::History));

    let mut device = MockDevice::default();
    execute_plan(&mut device, &plan).unwrap();
    assert_eq!(device.calls, vec!["noise"]);
}
