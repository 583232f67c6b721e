use super::*;

#[test]
fn container_round_trips_name_and_words() {
    let words: Vec<u32> = (0..27).map(|i| i * 7).collect();
    let decoded = decode_nvdb(&encode_nvdb("density", &words)).unwrap();
    assert_eq!(decoded.grid_name, "density");
    assert_eq!(decoded.element_count, 27);
    assert_eq!(decoded.struct_stride, 4);
    assert_eq!(decoded.byte_size, 108);
    assert_eq!(decoded.words, words);
}

#[test]
fn raw_grid_buffer_is_accepted() {
    let mut grid = vec![0u8; 48];
    grid[..8].copy_from_slice(b"NanoVDB1");
    grid[32..40].copy_from_slice(&48u64.to_le_bytes());
    grid[40] = 0xAB;
    let decoded = decode_nvdb(&grid).unwrap();
    assert_eq!(decoded.element_count, 12);
    assert_eq!(decoded.words[10], 0xAB);
}

#[test]
fn bad_magic_is_a_decode_error() {
    let err = decode_nvdb(b"NotAVolume.......").unwrap_err();
    assert!(matches!(err, NanoVolumeError::Decode(_)));
}

#[test]
fn compressed_codec_is_rejected() {
    let mut bytes = encode_nvdb("g", &[1, 2, 3]);
    bytes[14] = 1;
    let err = decode_nvdb(&bytes).unwrap_err();
    assert!(err.to_string().contains("codec"));
}

#[test]
fn truncated_payload_is_rejected() {
    let mut bytes = encode_nvdb("g", &[1, 2, 3, 4]);
    bytes.truncate(bytes.len() - 3);
    assert!(matches!(
        decode_nvdb(&bytes).unwrap_err(),
        NanoVolumeError::Decode(_)
    ));
    assert!(decode_nvdb(&bytes[..10]).is_err());
}

#[test]
fn missing_file_is_a_decode_error() {
    let err = NanoVdbDecoder
        .decode(Path::new("/definitely/not/here.nvdb"))
        .unwrap_err();
    match err {
        NanoVolumeError::Decode(msg) => assert!(msg.contains("here.nvdb")),
        other => panic!("unexpected error: {other}"),
    }
}
