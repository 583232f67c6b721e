use super::*;
use crate::foundation::core::{SpatialFilter, Vec3};
use crate::foundation::rng::Pcg32;
use crate::render::noise::interleaved_gradient_noise;

fn canvas() -> Canvas {
    Canvas::new(8, 6).unwrap()
}

fn march() -> MarchParams {
    MarchParams {
        density: 3.0,
        light_steps: 2,
        light_ray_length: 0.5,
        view_steps: 16,
        clip_min: 0.01,
        clip_max: 100.0,
        half_extent: 1.0,
        light_dir: Vec3::new(0.0, -1.0, 0.0),
        camera_position: Vec3::new(0.0, 0.0, -3.0),
        camera_rotation: Vec3::ZERO,
        fov_y_deg: 60.0,
    }
}

fn device_with_surfaces() -> CpuDevice {
    let mut dev = CpuDevice::new();
    for id in SurfaceId::ALL {
        dev.ensure_surface(id, canvas()).unwrap();
    }
    dev
}

#[test]
fn buffer_lifecycle() {
    let mut dev = CpuDevice::new();
    let h = dev
        .create_structured_buffer("vol", 3, 4, &[1, 2, 3])
        .unwrap();
    assert_eq!(dev.buffer_len(h), Some(3));
    assert_eq!(dev.live_buffer_count(), 1);
    dev.release_buffer(h);
    assert_eq!(dev.buffer_len(h), None);
    dev.release_buffer(h);
    assert_eq!(dev.live_buffer_count(), 0);
}

#[test]
fn buffer_rejects_mismatched_counts() {
    let mut dev = CpuDevice::new();
    assert!(dev.create_structured_buffer("vol", 4, 4, &[1, 2, 3]).is_err());
    assert!(dev.create_structured_buffer("vol", 3, 8, &[1, 2, 3]).is_err());
}

#[test]
fn sample_needs_allocated_target() {
    let mut dev = CpuDevice::new();
    let h = dev.create_structured_buffer("vol", 8, 4, &[255; 8]).unwrap();
    let pass = SamplePass {
        volume: h,
        target: SurfaceId::NewSample,
        march: march(),
        noise: NoiseKind::Ign,
        noise_strength: 1.0,
        frame: 0,
    };
    let err = dev.exec_sample(&pass).unwrap_err();
    assert!(matches!(err, NanoVolumeError::ResourceNotReady(_)));
}

#[test]
fn sample_with_missing_bank_falls_back_to_ign() {
    let mut dev = device_with_surfaces();
    let h = dev.create_structured_buffer("vol", 8, 4, &[255; 8]).unwrap();
    let mut pass = SamplePass {
        volume: h,
        target: SurfaceId::NewSample,
        march: march(),
        noise: NoiseKind::Blue,
        noise_strength: 1.0,
        frame: 3,
    };
    dev.exec_sample(&pass).unwrap();
    let blue = dev.surface_data(SurfaceId::NewSample).unwrap().to_vec();
    pass.noise = NoiseKind::Ign;
    dev.exec_sample(&pass).unwrap();
    assert_eq!(dev.surface_data(SurfaceId::NewSample).unwrap(), blue.as_slice());
}

#[test]
fn uploaded_bank_survives_sampling() {
    let mut dev = device_with_surfaces();
    let bank = NoiseBank::white(4, 2, &mut Pcg32::new(9)).unwrap();
    dev.upload_noise_bank(&bank).unwrap();
    let h = dev.create_structured_buffer("vol", 8, 4, &[200; 8]).unwrap();
    dev.exec_sample(&SamplePass {
        volume: h,
        target: SurfaceId::NewSample,
        march: march(),
        noise: NoiseKind::White,
        noise_strength: 0.5,
        frame: 1,
    })
    .unwrap();
    assert_eq!(dev.noise_bank(NoiseKind::White), Some(&bank));
    dev.release_noise_banks();
    assert!(dev.noise_bank(NoiseKind::White).is_none());
}

#[test]
fn temporal_blend_then_copy_updates_history() {
    let mut dev = device_with_surfaces();
    let h = dev.create_structured_buffer("vol", 8, 4, &[255; 8]).unwrap();
    dev.exec_ground_truth(&GroundTruthPass {
        volume: h,
        target: SurfaceId::SpatialFiltered,
        march: march(),
    })
    .unwrap();
    dev.exec_temporal(&TemporalPass {
        sample: SurfaceId::SpatialFiltered,
        history: SurfaceId::History,
        output: SurfaceId::FinalFrame,
        history_weight: 0.5,
    })
    .unwrap();
    let filtered = dev.surface_data(SurfaceId::SpatialFiltered).unwrap().to_vec();
    let blended = dev.surface_data(SurfaceId::FinalFrame).unwrap().to_vec();
    for (f, b) in filtered.iter().zip(&blended) {
        assert!((f[3] * 0.5 - b[3]).abs() < 1e-6);
    }

    dev.exec_copy(&CopyPass {
        src: SurfaceId::FinalFrame,
        dst: SurfaceId::History,
    })
    .unwrap();
    assert_eq!(dev.surface_data(SurfaceId::History).unwrap(), blended.as_slice());

    dev.exec_composite(&CompositePass {
        src: SurfaceId::FinalFrame,
    })
    .unwrap();
    let out = dev.read_output().unwrap();
    assert_eq!((out.width, out.height), (8, 6));
    assert_eq!(out.data, blended);
}

#[test]
fn in_place_filters_are_rejected() {
    let mut dev = device_with_surfaces();
    assert!(
        dev.exec_spatial(&SpatialPass {
            input: SurfaceId::NewSample,
            output: SurfaceId::NewSample,
            filter: SpatialFilter::Box3x3,
        })
        .is_err()
    );
    assert!(
        dev.exec_temporal(&TemporalPass {
            sample: SurfaceId::FinalFrame,
            history: SurfaceId::History,
            output: SurfaceId::FinalFrame,
            history_weight: 0.9,
        })
        .is_err()
    );
    assert_eq!(dev.live_surface_count(), SurfaceId::ALL.len());
}

#[test]
fn ensure_surface_resizes_and_release_drops() {
    let mut dev = CpuDevice::new();
    dev.ensure_surface(SurfaceId::Output, canvas()).unwrap();
    dev.ensure_surface(SurfaceId::Output, Canvas::new(2, 2).unwrap())
        .unwrap();
    assert_eq!(dev.surface_data(SurfaceId::Output).unwrap().len(), 4);
    dev.release_surface(SurfaceId::Output);
    assert!(dev.read_output().is_err());
}

#[test]
fn noise_pass_writes_the_active_layer() {
    let mut dev = device_with_surfaces();
    let bank = NoiseBank::white(4, 3, &mut Pcg32::new(5)).unwrap();
    dev.upload_noise_bank(&bank).unwrap();
    dev.exec_noise(&NoisePass {
        target: SurfaceId::Output,
        noise: NoiseKind::White,
        frame: 4,
    })
    .unwrap();
    let out = dev.surface_data(SurfaceId::Output).unwrap();
    for y in 0..6u32 {
        for x in 0..8u32 {
            let v = bank.sample(x, y, 4);
            assert_eq!(out[(y * 8 + x) as usize], [v, v, v, 1.0]);
        }
    }
    assert_eq!(dev.noise_bank(NoiseKind::White), Some(&bank));
}

#[test]
fn noise_pass_without_bank_shows_ign() {
    let mut dev = device_with_surfaces();
    dev.exec_noise(&NoisePass {
        target: SurfaceId::Output,
        noise: NoiseKind::Stbn,
        frame: 7,
    })
    .unwrap();
    let out = dev.surface_data(SurfaceId::Output).unwrap();
    assert_eq!(out[8 + 3][0], interleaved_gradient_noise(3, 1, 7));
    dev.release_surface(SurfaceId::Output);
    assert!(
        dev.exec_noise(&NoisePass {
            target: SurfaceId::Output,
            noise: NoiseKind::Ign,
            frame: 0,
        })
        .is_err()
    );
}
