use std::path::Path;

use anyhow::Context;

use crate::foundation::error::{NanoVolumeError, NanoVolumeResult};

const FILE_MAGIC_V0: &[u8; 8] = b"NanoVDB0";
const FILE_MAGIC_V2: &[u8; 8] = b"NanoVDB2";
const GRID_MAGIC: &[u8; 8] = b"NanoVDB1";

const FILE_HEADER_LEN: usize = 16;
const GRID_META_LEN: usize = 176;
const GRID_SIZE_OFFSET: usize = 32;
const CODEC_NONE: u16 = 0;
const WORD: u64 = 4;

/// Flat word buffer produced by a decode. Consumed by `VolumeLoader::bind_to_asset`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedVolume {
    pub words: Vec<u32>,
    pub element_count: u64,
    pub struct_stride: u64,
    pub byte_size: u64,
    pub grid_name: String,
}

impl DecodedVolume {
    pub fn from_words(grid_name: impl Into<String>, words: Vec<u32>) -> Self {
        let element_count = words.len() as u64;
        Self {
            words,
            element_count,
            struct_stride: WORD,
            byte_size: element_count * WORD,
            grid_name: grid_name.into(),
        }
    }
}

/// Boundary between the loader and a volume container format.
pub trait VolumeDecoder {
    fn decode(&self, path: &Path) -> NanoVolumeResult<DecodedVolume>;
}

/// Reads the first grid of an uncompressed `.nvdb` file, or a raw grid buffer.
#[derive(Clone, Copy, Debug, Default)]
pub struct NanoVdbDecoder;

impl VolumeDecoder for NanoVdbDecoder {
    fn decode(&self, path: &Path) -> NanoVolumeResult<DecodedVolume> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read volume '{}'", path.display()))
            .map_err(|e| NanoVolumeError::decode(format!("{e:#}")))?;
        decode_nvdb(&bytes)
    }
}

fn read_u16(bytes: &[u8], at: usize) -> NanoVolumeResult<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| NanoVolumeError::decode(format!("truncated container at byte {at}")))
}

fn read_u32(bytes: &[u8], at: usize) -> NanoVolumeResult<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| NanoVolumeError::decode(format!("truncated container at byte {at}")))
}

fn read_u64(bytes: &[u8], at: usize) -> NanoVolumeResult<u64> {
    let lo = read_u32(bytes, at)? as u64;
    let hi = read_u32(bytes, at + 4)? as u64;
    Ok(lo | (hi << 32))
}

/// Decode an in-memory `.nvdb` container.
pub fn decode_nvdb(bytes: &[u8]) -> NanoVolumeResult<DecodedVolume> {
    let magic = bytes
        .get(..8)
        .ok_or_else(|| NanoVolumeError::decode("file is shorter than a container header"))?;

    if magic == GRID_MAGIC {
        let grid_size = read_u64(bytes, GRID_SIZE_OFFSET)?;
        let payload = slice_payload(bytes, 0, grid_size)?;
        return words_from_payload("", payload);
    }
    if magic != FILE_MAGIC_V0 && magic != FILE_MAGIC_V2 {
        return Err(NanoVolumeError::decode("not a NanoVDB container (bad magic)"));
    }

    let grid_count = read_u16(bytes, 12)?;
    let codec = read_u16(bytes, 14)?;
    if grid_count == 0 {
        return Err(NanoVolumeError::decode("container holds no grids"));
    }
    if codec != CODEC_NONE {
        return Err(NanoVolumeError::decode(format!(
            "unsupported container codec {codec}"
        )));
    }

    let meta = FILE_HEADER_LEN;
    if bytes.len() < meta + GRID_META_LEN {
        return Err(NanoVolumeError::decode("truncated grid metadata"));
    }
    let grid_size = read_u64(bytes, meta)?;
    let name_size = read_u32(bytes, meta + 136)? as usize;
    let grid_codec = read_u16(bytes, meta + 168)?;
    if grid_codec != CODEC_NONE {
        return Err(NanoVolumeError::decode(format!(
            "unsupported grid codec {grid_codec}"
        )));
    }

    let name_at = meta + GRID_META_LEN;
    let name_bytes = bytes
        .get(name_at..name_at + name_size)
        .ok_or_else(|| NanoVolumeError::decode("truncated grid name"))?;
    let name = String::from_utf8_lossy(name_bytes)
        .trim_end_matches('\0')
        .to_string();

    let payload = slice_payload(bytes, name_at + name_size, grid_size)?;
    words_from_payload(&name, payload)
}

fn slice_payload(bytes: &[u8], at: usize, grid_size: u64) -> NanoVolumeResult<&[u8]> {
    let len = usize::try_from(grid_size)
        .map_err(|_| NanoVolumeError::decode("grid size exceeds address space"))?;
    bytes.get(at..at.saturating_add(len)).ok_or_else(|| {
        NanoVolumeError::decode(format!(
            "grid payload of {grid_size} bytes overruns the {}-byte container",
            bytes.len()
        ))
    })
}

fn words_from_payload(name: &str, payload: &[u8]) -> NanoVolumeResult<DecodedVolume> {
    if payload.len() as u64 % WORD != 0 {
        return Err(NanoVolumeError::decode(format!(
            "grid size {} is not a multiple of {WORD} bytes",
            payload.len()
        )));
    }
    let words = payload
        .chunks_exact(WORD as usize)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(DecodedVolume::from_words(name, words))
}

/// Serialize `words` as a single-grid, uncompressed `NanoVDB0` container.
pub fn encode_nvdb(grid_name: &str, words: &[u32]) -> Vec<u8> {
    let grid_size = words.len() as u64 * WORD;
    let name_size = grid_name.len() as u32 + 1;

    let mut out = Vec::with_capacity(
        FILE_HEADER_LEN + GRID_META_LEN + name_size as usize + grid_size as usize,
    );
    out.extend_from_slice(FILE_MAGIC_V0);
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&CODEC_NONE.to_le_bytes());

    let mut meta = [0u8; GRID_META_LEN];
    meta[0..8].copy_from_slice(&grid_size.to_le_bytes());
    meta[8..16].copy_from_slice(&grid_size.to_le_bytes());
    meta[24..32].copy_from_slice(&(words.len() as u64).to_le_bytes());
    meta[136..140].copy_from_slice(&name_size.to_le_bytes());
    meta[168..170].copy_from_slice(&CODEC_NONE.to_le_bytes());
    meta[172..176].copy_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&meta);

    out.extend_from_slice(grid_name.as_bytes());
    out.push(0);
    for w in words {
        out.extend_from_slice(&w.to_le_bytes());
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
