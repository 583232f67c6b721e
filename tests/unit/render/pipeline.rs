use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::{Duration, Instant};

use tracing_subscriber::layer::SubscriberExt as _;

use super::*;
use crate::assets::decode::DecodedVolume;
use crate::render::cpu::CpuDevice;
use crate::render::noise::interleaved_gradient_noise;

fn small_opts() -> RenderOpts {
    RenderOpts {
        width: 8,
        height: 6,
        view_steps: 8,
        gt_view_steps: 16,
        noise_size: 4,
        ..RenderOpts::default()
    }
}

/// Pipeline over `n` assets, the first `loaded` of which are bound to lattice buffers.
fn pipeline_with(n: usize, loaded: usize, opts: RenderOpts) -> RenderPipeline<CpuDevice> {
    let mut device = CpuDevice::new();
    let mut assets: Vec<VolumeAsset> = (0..n)
        .map(|i| VolumeAsset::new(format!("vol_{i}.nvdb")))
        .collect();
    let loader = VolumeLoader::new();
    for asset in assets.iter_mut().take(loaded) {
        let decoded = DecodedVolume::from_words("density", vec![180; 64]);
        loader.bind_to_asset(decoded, asset, &mut device).unwrap();
    }
    RenderPipeline::new(
        device,
        VolumeAssetStore::new(assets),
        opts,
        SceneView::default(),
    )
    .unwrap()
}

fn surface(p: &RenderPipeline<CpuDevice>, id: SurfaceId) -> Vec<[f32; 4]> {
    p.device().surface_data(id).unwrap().to_vec()
}

#[test]
fn state_selection_truth_table() {
    use PipelineState::*;
    assert_eq!(PipelineState::select(false, true, true), Idle);
    assert_eq!(PipelineState::select(false, false, false), Idle);
    assert_eq!(PipelineState::select(true, true, false), GroundTruth);
    assert_eq!(PipelineState::select(true, true, true), GroundTruth);
    assert_eq!(PipelineState::select(true, false, false), InteractiveNoTemporal);
    assert_eq!(PipelineState::select(true, false, true), InteractiveTemporal);
    assert!(InteractiveTemporal.is_interactive());
    assert!(!GroundTruth.is_interactive());
}

#[test]
fn counter_wraps_after_cycle_length_ticks() {
    let mut p = pipeline_with(1, 1, small_opts());
    for i in 0..63u32 {
        let report = p.advance();
        assert_eq!(
            report,
            TickReport::Rendered {
                state: PipelineState::InteractiveTemporal,
                frame: i
            }
        );
        assert_eq!(p.frame_counter(), i + 1);
    }
    p.advance();
    assert_eq!(p.frame_counter(), 0);
}

#[test]
fn counter_advances_without_temporal_but_not_in_ground_truth() {
    let mut p = pipeline_with(1, 1, small_opts());
    p.toggle_temporal_filtering();
    p.advance();
    assert_eq!(p.frame_counter(), 1);
    p.toggle_ground_truth();
    assert!(p.advance().is_rendered());
    assert_eq!(p.frame_counter(), 1);
}

#[test]
fn ground_truth_and_no_temporal_leave_history_alone() {
    let mut p = pipeline_with(1, 1, small_opts());
    p.advance();
    p.advance();
    let history = surface(&p, SurfaceId::History);
    assert!(history.iter().any(|px| px[3] > 0.0));

    p.set_ground_truth(true);
    assert_eq!(p.state(), PipelineState::GroundTruth);
    p.advance();
    assert_eq!(surface(&p, SurfaceId::History), history);

    p.set_ground_truth(false);
    p.toggle_temporal_filtering();
    p.set_spatial_filter(3).unwrap();
    p.advance();
    assert_eq!(surface(&p, SurfaceId::History), history);
    assert_eq!(
        surface(&p, SurfaceId::Output),
        surface(&p, SurfaceId::SpatialFiltered)
    );
}

#[test]
fn temporal_tick_copies_blend_into_history_and_output() {
    let mut p = pipeline_with(1, 1, small_opts());
    p.advance();
    let final_frame = surface(&p, SurfaceId::FinalFrame);
    assert_eq!(surface(&p, SurfaceId::History), final_frame);
    assert_eq!(surface(&p, SurfaceId::Output), final_frame);
}

#[test]
fn first_temporal_tick_reseeds_history() {
    let mut p = pipeline_with(1, 1, small_opts());
    assert_eq!(p.effective_history_weight(), 0.0);
    p.advance();
    assert_eq!(
        surface(&p, SurfaceId::FinalFrame),
        surface(&p, SurfaceId::SpatialFiltered)
    );
    assert_eq!(p.effective_history_weight(), 0.9);

    p.toggle_temporal_filtering();
    p.advance();
    p.toggle_temporal_filtering();
    assert_eq!(p.effective_history_weight(), 0.0);
    p.advance();
    assert_eq!(p.effective_history_weight(), 0.9);
}

#[test]
fn legacy_policy_blends_stale_history() {
    let mut opts = small_opts();
    opts.temporal.reseed_history_on_enable = false;
    let mut p = pipeline_with(1, 1, opts);
    assert_eq!(p.effective_history_weight(), 0.9);
    p.toggle_temporal_filtering();
    p.advance();
    p.toggle_temporal_filtering();
    assert_eq!(p.effective_history_weight(), 0.9);
}

#[test]
fn model_switch_invalidates_history() {
    let mut p = pipeline_with(2, 2, small_opts());
    p.advance();
    assert_eq!(p.effective_history_weight(), 0.9);
    p.load_next_model(1);
    assert_eq!(p.effective_history_weight(), 0.0);
}

#[test]
fn unloaded_asset_is_idle_and_output_is_kept() {
    let mut p = pipeline_with(2, 1, small_opts());
    p.advance();
    let before = surface(&p, SurfaceId::Output);
    p.load_next_model(1);
    assert_eq!(p.state(), PipelineState::Idle);
    assert_eq!(p.advance(), TickReport::Idle);
    assert_eq!(surface(&p, SurfaceId::Output), before);
    assert_eq!(p.frame_counter(), 1);
}

#[test]
fn empty_store_is_idle() {
    let mut p = pipeline_with(0, 0, small_opts());
    assert_eq!(p.advance(), TickReport::Idle);
    assert_eq!(p.load_next_model(1), None);
}

/// Counts WARN events seen while installed.
#[derive(Clone, Default)]
struct WarnCount(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCount {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn idle_ticks_on_an_empty_store_do_not_warn() {
    let warns = WarnCount::default();
    let subscriber = tracing_subscriber::registry().with(warns.clone());
    tracing::subscriber::with_default(subscriber, || {
        let mut p = pipeline_with(0, 0, small_opts());
        for _ in 0..3 {
            assert_eq!(p.advance(), TickReport::Idle);
        }
        assert_eq!(p.state(), PipelineState::Idle);
        assert!(p.active_asset().is_none());
    });
    assert_eq!(warns.0.load(Ordering::SeqCst), 0);
}

#[test]
fn load_next_model_rejects_other_directions() {
    let mut p = pipeline_with(3, 3, small_opts());
    assert_eq!(p.load_next_model(2), None);
    assert_eq!(p.load_next_model(0), None);
    assert_eq!(p.load_next_model(-3), None);
    assert_eq!(p.active_index(), 0);
    assert_eq!(p.load_next_model(-1), Some(2));
}

#[test]
fn load_next_model_wraps_both_ways() {
    let mut p = pipeline_with(3, 3, small_opts());
    p.set_active_asset(2).unwrap();
    assert_eq!(p.load_next_model(1), Some(0));
    assert_eq!(p.active_index(), 0);
    assert_eq!(p.load_next_model(-1), Some(2));
    assert_eq!(p.active_index(), 2);
    assert!(matches!(
        p.set_active_asset(3).unwrap_err(),
        NanoVolumeError::IndexOutOfRange { index: 3, len: 3 }
    ));
}

#[test]
fn control_ids_are_validated() {
    let mut p = pipeline_with(1, 1, small_opts());
    p.set_noise_type(5).unwrap();
    assert_eq!(p.noise(), NoiseKind::Ign);
    assert!(p.set_noise_type(0).is_err());
    assert!(p.set_noise_type(6).is_err());
    assert_eq!(p.noise(), NoiseKind::Ign);

    p.set_spatial_filter(6).unwrap();
    assert_eq!(p.spatial(), SpatialFilter::Binomial5x5);
    assert!(p.set_spatial_filter(7).is_err());
    assert_eq!(p.spatial(), SpatialFilter::Binomial5x5);
}

#[test]
fn parameter_setters_are_frozen_in_ground_truth() {
    let mut p = pipeline_with(1, 1, small_opts());
    assert!(p.set_density(2.0));
    assert!(p.set_light_step_samples(3));
    assert!(p.set_sun_yaw(10.0));

    p.toggle_ground_truth();
    assert!(!p.set_density(9.0));
    assert!(!p.set_light_step_samples(99));
    assert!(!p.set_sun_yaw(90.0));

    let asset = p.active_asset().unwrap();
    assert_eq!(asset.density, 2.0);
    assert_eq!(asset.light_step_samples, 3);
    assert_eq!(p.view().sun_rotation.y, 10.0);
}

#[test]
fn noise_strength_is_validated_and_frozen_in_ground_truth() {
    let mut p = pipeline_with(1, 1, small_opts());
    assert!(p.set_noise_strength(0.5));
    assert!(!p.set_noise_strength(-1.0));
    assert!(!p.set_noise_strength(f32::NAN));

    p.toggle_ground_truth();
    assert!(!p.set_noise_strength(2.0));
    assert_eq!(p.active_asset().unwrap().noise_strength, 0.5);

    p.toggle_ground_truth();
    assert!(p.set_noise_strength(0.0));
    assert_eq!(p.active_asset().unwrap().noise_strength, 0.0);
}

#[test]
fn show_noise_displays_the_active_bank_layer() {
    let mut p = pipeline_with(1, 1, small_opts());
    let history = surface(&p, SurfaceId::History);
    assert!(p.set_noise_strength(0.25));
    assert!(p.toggle_show_noise());
    assert!(p.show_noise());

    for frame in 0..2u32 {
        assert_eq!(
            p.advance(),
            TickReport::Rendered {
                state: PipelineState::InteractiveTemporal,
                frame
            }
        );
        let bank = p.device().noise_bank(NoiseKind::White).unwrap();
        let out = surface(&p, SurfaceId::Output);
        for y in 0..6u32 {
            for x in 0..8u32 {
                let v = bank.sample(x, y, frame);
                assert_eq!(out[(y * 8 + x) as usize], [v, v, v, 1.0]);
            }
        }
    }
    assert_eq!(p.frame_counter(), 2);
    assert_eq!(surface(&p, SurfaceId::History), history);
    assert_eq!(p.effective_history_weight(), 0.0);

    assert!(!p.toggle_show_noise());
    p.advance();
    assert_eq!(
        surface(&p, SurfaceId::Output),
        surface(&p, SurfaceId::FinalFrame)
    );
    assert_eq!(p.effective_history_weight(), 0.9);
}

#[test]
fn show_noise_with_ign_is_analytic() {
    let mut p = pipeline_with(1, 1, small_opts());
    p.toggle_temporal_filtering();
    p.set_noise_type(NoiseKind::Ign.id()).unwrap();
    p.toggle_show_noise();
    p.advance();
    p.advance();
    let out = surface(&p, SurfaceId::Output);
    for y in 0..6u32 {
        for x in 0..8u32 {
            let v = interleaved_gradient_noise(x, y, 1);
            assert_eq!(out[(y * 8 + x) as usize], [v, v, v, 1.0]);
        }
    }
}

#[test]
fn teardown_releases_everything_once() {
    let mut p = pipeline_with(2, 2, small_opts());
    assert_eq!(p.device().live_buffer_count(), 2);
    p.teardown();
    assert!(p.is_torn_down());
    assert_eq!(p.device().live_buffer_count(), 0);
    assert_eq!(p.device().live_surface_count(), 0);
    assert!(p.device().noise_bank(NoiseKind::White).is_none());
    p.teardown();
    assert_eq!(p.state(), PipelineState::Idle);
    assert_eq!(p.advance(), TickReport::Idle);
}

#[test]
fn failing_pass_skips_without_advancing() {
    let mut p = pipeline_with(1, 1, small_opts());
    p.device_mut().release_surface(SurfaceId::History);
    let report = p.advance();
    assert!(matches!(
        report,
        TickReport::Skipped {
            state: PipelineState::InteractiveTemporal,
            ..
        }
    ));
    assert_eq!(p.frame_counter(), 0);
    assert_eq!(p.effective_history_weight(), 0.0);
}

#[test]
fn frame_timer_reports_once_per_window() {
    let mut timer = FrameTimer::new(3);
    let t0 = Instant::now();
    assert_eq!(timer.tick_at(t0), None);
    assert_eq!(timer.tick_at(t0 + Duration::from_millis(10)), None);
    assert_eq!(timer.tick_at(t0 + Duration::from_millis(20)), None);
    let fps = timer.tick_at(t0 + Duration::from_millis(30)).unwrap();
    assert!((fps - 100.0).abs() < 1e-6);
    assert_eq!(timer.tick_at(t0 + Duration::from_millis(40)), None);
}
