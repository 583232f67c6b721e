use crate::{foundation::core::volume_stem, render::device::BufferHandle};

/// One renderable volume and its interactive / ground-truth parameter sets.
///
/// The device buffer is owned by the asset once bound; `is_loaded()` is derived from it so the
/// two can never disagree.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeAsset {
    pub path: String,
    pub density: f32,
    pub light_step_samples: u32,
    pub noise_strength: f32,
    pub gt_density: f32,
    pub gt_light_step_samples: u32,
    pub gt_light_ray_length: f32,
    buffer: Option<BufferHandle>,
}

impl VolumeAsset {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            density: 1.0,
            light_step_samples: 8,
            noise_strength: 1.0,
            gt_density: 1.0,
            gt_light_step_samples: 64,
            gt_light_ray_length: 1.0,
            buffer: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.buffer.is_some()
    }

    /// The device buffer, or `None` (logged) while the asset is unloaded.
    pub fn buffer(&self) -> Option<BufferHandle> {
        if self.buffer.is_none() {
            tracing::debug!(path = %self.path, "volume asset not loaded");
        }
        self.buffer
    }

    /// File stem of the volume path, used in sidecars and snapshot names.
    pub fn volume_name(&self) -> String {
        volume_stem(&self.path)
    }

    /// Bind a new buffer, returning the previous one for release.
    pub(crate) fn replace_buffer(&mut self, handle: BufferHandle) -> Option<BufferHandle> {
        self.buffer.replace(handle)
    }

    pub(crate) fn take_buffer(&mut self) -> Option<BufferHandle> {
        self.buffer.take()
    }
}

/// Index-addressed collection of volume assets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VolumeAssetStore {
    assets: Vec<VolumeAsset>,
}

impl VolumeAssetStore {
    pub fn new(assets: Vec<VolumeAsset>) -> Self {
        Self { assets }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&VolumeAsset> {
        let asset = self.assets.get(index);
        if asset.is_none() {
            tracing::warn!(index, len = self.assets.len(), "volume asset index out of range");
        }
        asset
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut VolumeAsset> {
        let len = self.assets.len();
        let asset = self.assets.get_mut(index);
        if asset.is_none() {
            tracing::warn!(index, len, "volume asset index out of range");
        }
        asset
    }

    pub fn iter(&self) -> impl Iterator<Item = &VolumeAsset> {
        self.assets.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut VolumeAsset> {
        self.assets.iter_mut()
    }
}

/// Step `current` by `direction`, wrapping modulo `len`. `None` for an empty store.
pub fn wrap_index(current: usize, direction: i32, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let len = len as i64;
    Some((current as i64 + direction as i64).rem_euclid(len) as usize)
}
