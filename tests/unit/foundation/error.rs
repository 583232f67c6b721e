use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        NanoVolumeError::decode("x")
            .to_string()
            .contains("decode error:")
    );
    assert!(
        NanoVolumeError::not_ready("x")
            .to_string()
            .contains("resource not ready:")
    );
    assert!(
        NanoVolumeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        NanoVolumeError::device("x")
            .to_string()
            .contains("device error:")
    );
    assert!(
        NanoVolumeError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn structured_variants_render_their_fields() {
    let err = NanoVolumeError::DimensionMismatch {
        a_width: 4,
        a_height: 3,
        b_width: 4,
        b_height: 2,
    };
    assert_eq!(err.to_string(), "dimension mismatch: 4x3 vs 4x2");

    let err = NanoVolumeError::index_out_of_range(-1, 3);
    assert_eq!(err.to_string(), "index -1 out of range [0, 3)");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = NanoVolumeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
