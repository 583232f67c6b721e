use std::{path::Path, time::Duration, time::Instant};

use crate::{
    assets::decode::{DecodedVolume, NanoVdbDecoder, VolumeDecoder},
    assets::store::{VolumeAsset, VolumeAssetStore},
    foundation::error::{NanoVolumeError, NanoVolumeResult},
    render::device::RenderDevice,
};

/// Outcome of [`VolumeLoader::load_all`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: usize,
    /// `(asset index, diagnostic)` for every asset that stayed unloaded.
    pub failed: Vec<(usize, String)>,
    pub elapsed: Duration,
}

impl LoadReport {
    pub fn all_loaded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Decodes volume containers and binds them to assets as device buffers.
#[derive(Clone, Debug, Default)]
pub struct VolumeLoader<Dec = NanoVdbDecoder> {
    decoder: Dec,
}

impl VolumeLoader<NanoVdbDecoder> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<Dec: VolumeDecoder> VolumeLoader<Dec> {
    pub fn with_decoder(decoder: Dec) -> Self {
        Self { decoder }
    }

    /// Decode `path`. Every failure surfaces as [`NanoVolumeError::Decode`]; nothing is retried.
    #[tracing::instrument(skip(self))]
    pub fn load(&self, path: &Path) -> NanoVolumeResult<DecodedVolume> {
        let decoded = self.decoder.decode(path).map_err(|e| match e {
            NanoVolumeError::Decode(_) => e,
            other => NanoVolumeError::decode(other.to_string()),
        })?;
        if decoded.words.len() as u64 != decoded.element_count {
            return Err(NanoVolumeError::decode(format!(
                "decoder reported {} elements but produced {} words",
                decoded.element_count,
                decoded.words.len()
            )));
        }
        Ok(decoded)
    }

    /// Upload `decoded` into a fresh structured buffer owned by `asset`. Any buffer the asset
    /// held before is released. `decoded` is dropped before returning.
    pub fn bind_to_asset<D: RenderDevice + ?Sized>(
        &self,
        decoded: DecodedVolume,
        asset: &mut VolumeAsset,
        device: &mut D,
    ) -> NanoVolumeResult<()> {
        let label = asset.volume_name();
        let handle = device.create_structured_buffer(
            &label,
            decoded.element_count,
            decoded.struct_stride,
            &decoded.words,
        )?;
        drop(decoded);
        if let Some(old) = asset.replace_buffer(handle) {
            device.release_buffer(old);
        }
        Ok(())
    }

    /// Load every asset in order, one at a time. Failures are logged and reported, never fatal.
    #[tracing::instrument(skip_all, fields(assets = store.len()))]
    pub fn load_all<D: RenderDevice + ?Sized>(
        &self,
        store: &mut VolumeAssetStore,
        device: &mut D,
    ) -> LoadReport {
        let start = Instant::now();
        let mut report = LoadReport::default();

        for (index, asset) in store.iter_mut().enumerate() {
            let t0 = Instant::now();
            let result = self
                .load(Path::new(&asset.path))
                .and_then(|decoded| {
                    let bytes = decoded.byte_size;
                    self.bind_to_asset(decoded, asset, device).map(|()| bytes)
                });
            match result {
                Ok(bytes) => {
                    report.loaded += 1;
                    tracing::info!(
                        index,
                        path = %asset.path,
                        bytes,
                        ms = t0.elapsed().as_secs_f64() * 1000.0,
                        "volume loaded"
                    );
                }
                Err(e) => {
                    tracing::error!(index, path = %asset.path, error = %e, "volume load failed");
                    report.failed.push((index, e.to_string()));
                }
            }
        }

        report.elapsed = start.elapsed();
        tracing::info!(
            loaded = report.loaded,
            failed = report.failed.len(),
            ms = report.elapsed.as_secs_f64() * 1000.0,
            "volume loading finished"
        );
        report
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
