use image::Rgb;

use super::*;

fn solid(w: u32, h: u32, v: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(w, h, Rgb(v))
}

#[test]
fn identical_frames_score_zero() {
    let mut a = solid(5, 3, [10, 200, 30]);
    a.put_pixel(2, 1, Rgb([255, 0, 7]));
    assert_eq!(rmse(&a, &a, Channels::Rgb).unwrap(), 0.0);
    assert_eq!(rmse(&a, &a, Channels::Gray).unwrap(), 0.0);
}

#[test]
fn black_vs_white_depends_on_channel_count() {
    let black = solid(4, 4, [0, 0, 0]);
    let white = solid(4, 4, [255, 255, 255]);
    let rgb = rmse(&black, &white, Channels::Rgb).unwrap();
    assert!((rgb - 3f64.sqrt()).abs() < 1e-12);
    let gray = rmse(&black, &white, Channels::Gray).unwrap();
    assert!((gray - 1.0).abs() < 1e-12);
}

#[test]
fn error_is_averaged_over_pixels() {
    let a = solid(2, 2, [0, 0, 0]);
    let mut b = a.clone();
    b.put_pixel(0, 0, Rgb([255, 0, 0]));
    let v = rmse(&a, &b, Channels::Rgb).unwrap();
    assert!((v - 0.5).abs() < 1e-12);
    assert_eq!(v, rmse(&b, &a, Channels::Rgb).unwrap());
}

#[test]
fn size_mismatch_is_an_error_or_sentinel() {
    let a = solid(4, 4, [0, 0, 0]);
    let b = solid(4, 5, [0, 0, 0]);
    let err = rmse(&a, &b, Channels::Rgb).unwrap_err();
    assert!(matches!(
        err,
        NanoVolumeError::DimensionMismatch {
            a_width: 4,
            a_height: 4,
            b_width: 4,
            b_height: 5
        }
    ));
    assert_eq!(rmse_or_sentinel(&a, &b, Channels::Rgb), -1.0);
}
