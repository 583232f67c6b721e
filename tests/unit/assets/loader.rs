use std::collections::HashMap;

use super::*;
use crate::render::cpu::CpuDevice;

/// In-memory decoder keyed by path.
struct MapDecoder(HashMap<String, Vec<u32>>);

impl VolumeDecoder for MapDecoder {
    fn decode(&self, path: &Path) -> NanoVolumeResult<DecodedVolume> {
        let key = path.to_string_lossy().into_owned();
        self.0
            .get(&key)
            .map(|w| DecodedVolume::from_words("density", w.clone()))
            .ok_or_else(|| NanoVolumeError::decode(format!("no volume at '{key}'")))
    }
}

fn loader() -> VolumeLoader<MapDecoder> {
    VolumeLoader::with_decoder(MapDecoder(HashMap::from([
        ("a.nvdb".to_string(), vec![1; 8]),
        ("b.nvdb".to_string(), vec![2; 27]),
    ])))
}

#[test]
fn bind_reports_decoded_element_count() {
    let loader = loader();
    let mut device = CpuDevice::new();
    let mut asset = VolumeAsset::new("b.nvdb");
    let decoded = loader.load(Path::new("b.nvdb")).unwrap();
    let count = decoded.element_count;
    loader.bind_to_asset(decoded, &mut asset, &mut device).unwrap();
    let handle = asset.buffer().unwrap();
    assert_eq!(device.buffer_len(handle), Some(count));
}

#[test]
fn rebinding_releases_previous_buffer() {
    let loader = loader();
    let mut device = CpuDevice::new();
    let mut asset = VolumeAsset::new("a.nvdb");
    for _ in 0..3 {
        let decoded = loader.load(Path::new("a.nvdb")).unwrap();
        loader.bind_to_asset(decoded, &mut asset, &mut device).unwrap();
    }
    assert_eq!(device.live_buffer_count(), 1);
}

#[test]
fn load_all_keeps_going_past_failures() {
    let loader = loader();
    let mut device = CpuDevice::new();
    let mut store = VolumeAssetStore::new(vec![
        VolumeAsset::new("a.nvdb"),
        VolumeAsset::new("missing.nvdb"),
        VolumeAsset::new("b.nvdb"),
    ]);
    let report = loader.load_all(&mut store, &mut device);
    assert_eq!(report.loaded, 2);
    assert!(!report.all_loaded());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, 1);
    assert!(report.failed[0].1.contains("missing.nvdb"));
    assert!(store.get(0).unwrap().is_loaded());
    assert!(!store.get(1).unwrap().is_loaded());
    assert!(store.get(2).unwrap().is_loaded());
}

#[test]
fn non_decode_failures_are_reported_as_decode_errors() {
    struct Broken;
    impl VolumeDecoder for Broken {
        fn decode(&self, _path: &Path) -> NanoVolumeResult<DecodedVolume> {
            Err(NanoVolumeError::validation("boom"))
        }
    }
    let err = VolumeLoader::with_decoder(Broken)
        .load(Path::new("x"))
        .unwrap_err();
    assert!(matches!(err, NanoVolumeError::Decode(_)));
}
