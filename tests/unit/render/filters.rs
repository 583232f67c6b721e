use super::*;

fn canvas(w: u32, h: u32) -> Canvas {
    Canvas::new(w, h).unwrap()
}

#[test]
fn kernels_are_normalized_and_symmetric() {
    for filter in SpatialFilter::ALL {
        let k = kernel_weights(filter);
        assert_eq!(k.len() % 2, 1, "{filter:?}");
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "{filter:?} sums to {sum}");
        for i in 0..k.len() / 2 {
            assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-6);
        }
    }
    assert_eq!(kernel_weights(SpatialFilter::Binomial5x5)[2], 6.0 / 16.0);
}

#[test]
fn none_filter_is_a_copy() {
    let c = canvas(3, 2);
    let src: Vec<[f32; 4]> = (0..6).map(|i| [i as f32, 0.5, 2.0, 1.0]).collect();
    let mut dst = vec![[0.0; 4]; 6];
    apply_spatial_filter(&src, &mut dst, c, SpatialFilter::None).unwrap();
    assert_eq!(src, dst);
}

#[test]
fn constant_image_is_preserved_by_every_filter() {
    let c = canvas(7, 5);
    let src = vec![[0.25, 0.5, 0.75, 1.0]; c.pixel_count()];
    for filter in SpatialFilter::ALL {
        let mut dst = vec![[0.0; 4]; c.pixel_count()];
        apply_spatial_filter(&src, &mut dst, c, filter).unwrap();
        for px in &dst {
            for ch in 0..4 {
                assert!((px[ch] - src[0][ch]).abs() < 1e-5, "{filter:?}");
            }
        }
    }
}

#[test]
fn box_filter_spreads_a_single_spike() {
    let c = canvas(5, 5);
    let mut src = vec![[0.0; 4]; 25];
    src[12] = [9.0, 9.0, 9.0, 9.0];
    let mut dst = vec![[0.0; 4]; 25];
    apply_spatial_filter(&src, &mut dst, c, SpatialFilter::Box3x3).unwrap();
    assert!((dst[12][0] - 1.0).abs() < 1e-5);
    assert!((dst[6][0] - 1.0).abs() < 1e-5);
    assert_eq!(dst[0][0], 0.0);
}

#[test]
fn wrong_surface_size_is_rejected() {
    let mut dst = vec![[0.0; 4]; 4];
    assert!(apply_spatial_filter(&[[0.0; 4]; 3], &mut dst, canvas(2, 2), SpatialFilter::Box3x3).is_err());
}

#[test]
fn ema_with_zero_weight_takes_the_sample() {
    let sample = vec![[1.0, 0.0, 0.5, 1.0]];
    let history = vec![[0.0, 1.0, 0.0, 0.0]];
    let mut out = vec![[9.0; 4]];
    blend_ema(&sample, &history, &mut out, 0.0).unwrap();
    assert_eq!(out, sample);

    blend_ema(&sample, &history, &mut out, 0.75).unwrap();
    assert!((out[0][0] - 0.25).abs() < 1e-6);
    assert!((out[0][1] - 0.75).abs() < 1e-6);
}

#[test]
fn ema_rejects_full_history_weight() {
    let mut out = vec![[0.0; 4]];
    assert!(blend_ema(&[[0.0; 4]], &[[0.0; 4]], &mut out, 1.0).is_err());
}
