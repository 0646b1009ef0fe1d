//! On-disk cache for generated float textures.
//!
//! Files are keyed by a fingerprint of everything that shaped the texture,
//! so changing a parameter produces a new file instead of silently reusing an
//! old one. Each file repeats its fingerprint in the header, which catches
//! files that were renamed or copied by hand.

use std::fs;
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use log::{info, warn};
use serde::Serialize;

use crate::error::{Result, TerrainError};
use crate::packing::PackedTexture;

const MAGIC: [u8; 8] = *b"ISLNDTEX";
const EXTENSION: &str = "tex";

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CacheHeader {
    magic: [u8; 8],
    fingerprint: u64,
    width: u32,
    height: u32,
    layers: u32,
    channels: u32,
}

const HEADER_LEN: usize = std::mem::size_of::<CacheHeader>();

/// FNV-1a 64-bit hash
fn fnv1a_64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x00000100000001B3;
    let mut h = OFFSET;
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(PRIME);
    }
    h
}

/// Identifies one generated texture: a generator name plus a fingerprint of
/// its inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    name: String,
    fingerprint: u64,
}

impl CacheKey {
    /// Fingerprint `inputs` through their JSON form
    ///
    /// * `name` - Generator name, also the file stem
    /// * `inputs` - Everything the output depends on: dimensions, noise
    ///   parameters, post-processing settings
    pub fn new<S: Serialize>(name: &str, inputs: &S) -> Result<Self> {
        let mut bytes = name.as_bytes().to_vec();
        bytes.push(0);
        let json = serde_json::to_vec(inputs)
            .map_err(|e| TerrainError::invalid(format!("cannot fingerprint cache inputs: {e}")))?;
        bytes.extend_from_slice(&json);
        Ok(CacheKey {
            name: name.to_string(),
            fingerprint: fnv1a_64(&bytes),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    fn file_name(&self) -> String {
        format!("{}-{:016x}.{EXTENSION}", self.name, self.fingerprint)
    }
}

/// Directory of cached float textures
#[derive(Debug, Clone)]
pub struct TextureCache {
    root: PathBuf,
}

impl TextureCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TextureCache { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Read a cached texture, `Ok(None)` if there is no file for `key`
    pub fn load(&self, key: &CacheKey) -> Result<Option<PackedTexture<f32>>> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode(&path, key, &bytes).map(Some)
    }

    /// Write a texture under `key`
    ///
    /// The bytes go to a temporary file first and are renamed into place, so
    /// an interrupted write never leaves a truncated file under the final name.
    pub fn store(&self, key: &CacheKey, texture: &PackedTexture<f32>) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(key);
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        fs::write(&tmp, encode(key, texture)?)?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Return the cached texture for `key`, generating and storing it on a miss
    ///
    /// Stale or corrupt files are regenerated. A failed store is logged and
    /// the freshly generated texture is still returned.
    pub fn get_or_generate<F>(&self, key: &CacheKey, generate: F) -> Result<PackedTexture<f32>>
    where
        F: FnOnce() -> Result<PackedTexture<f32>>,
    {
        match self.load(key) {
            Ok(Some(texture)) => {
                info!("loaded cached texture {:?}", self.path_for(key));
                return Ok(texture);
            }
            Ok(None) => info!("generating texture {}", key.name()),
            Err(e) => warn!("discarding cache entry for {}: {e}", key.name()),
        }

        let texture = generate()?;
        match self.store(key, &texture) {
            Ok(path) => info!("cached texture at {path:?}"),
            Err(e) => warn!("failed to cache texture {}: {e}", key.name()),
        }
        Ok(texture)
    }
}

fn encode(key: &CacheKey, texture: &PackedTexture<f32>) -> Result<Vec<u8>> {
    let dim = |v: usize| {
        u32::try_from(v).map_err(|_| TerrainError::invalid(format!("dimension {v} too large to cache")))
    };
    let header = CacheHeader {
        magic: MAGIC,
        fingerprint: key.fingerprint,
        width: dim(texture.width())?,
        height: dim(texture.height())?,
        layers: dim(texture.layers())?,
        channels: dim(texture.channels())?,
    };
    let payload: &[u8] = bytemuck::cast_slice(texture.data());
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(bytemuck::bytes_of(&header));
    bytes.extend_from_slice(payload);
    Ok(bytes)
}

fn decode(path: &Path, key: &CacheKey, bytes: &[u8]) -> Result<PackedTexture<f32>> {
    let corrupt = |reason: &str| TerrainError::CacheCorrupt {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    if bytes.len() < HEADER_LEN {
        return Err(corrupt("file is shorter than its header"));
    }
    let header: CacheHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_LEN]);
    if header.magic != MAGIC {
        return Err(corrupt("bad magic"));
    }
    if header.fingerprint != key.fingerprint {
        return Err(TerrainError::CacheStale {
            path: path.to_path_buf(),
        });
    }

    let payload = &bytes[HEADER_LEN..];
    // header dimensions are untrusted, so the size arithmetic must not overflow
    let expected_len = [header.width, header.height, header.layers, header.channels]
        .iter()
        .try_fold(std::mem::size_of::<f32>(), |acc, &dim| acc.checked_mul(dim as usize))
        .ok_or_else(|| corrupt("header dimensions overflow"))?;
    if payload.len() != expected_len {
        return Err(corrupt("payload length does not match header"));
    }
    let data: Vec<f32> = bytemuck::pod_collect_to_vec(payload);
    PackedTexture::new(
        header.width as usize,
        header.height as usize,
        header.layers as usize,
        header.channels as usize,
        data,
    )
    .map_err(|e| corrupt(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise_gen::NoiseParameters;
    use std::cell::Cell;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "island-terrain-cache-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample_texture() -> PackedTexture<f32> {
        PackedTexture::new(3, 2, 2, 1, (0..12).map(|v| v as f32 * 0.5).collect()).unwrap()
    }

    #[test]
    fn test_key_depends_on_parameters() {
        let a = CacheKey::new("clouds", &NoiseParameters::default()).unwrap();
        let b = CacheKey::new("clouds", &NoiseParameters::default()).unwrap();
        let c = CacheKey::new(
            "clouds",
            &NoiseParameters {
                octaves: 7,
                ..NoiseParameters::default()
            },
        )
        .unwrap();
        let d = CacheKey::new("stars", &NoiseParameters::default()).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_ne!(a.fingerprint(), d.fingerprint());
    }

    #[test]
    fn test_store_then_load() {
        let cache = TextureCache::new(scratch_dir("roundtrip"));
        let key = CacheKey::new("volume", &(3, 2, 2)).unwrap();
        assert!(cache.load(&key).unwrap().is_none());

        let path = cache.store(&key, &sample_texture()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tex.tmp").exists());
        assert_eq!(cache.load(&key).unwrap(), Some(sample_texture()));

        let _ = fs::remove_dir_all(cache.root());
    }

    #[test]
    fn test_get_or_generate_only_generates_once() {
        let cache = TextureCache::new(scratch_dir("once"));
        let key = CacheKey::new("once", &1u32).unwrap();
        let calls = Cell::new(0);
        let generate = || {
            calls.set(calls.get() + 1);
            Ok(sample_texture())
        };

        let first = cache.get_or_generate(&key, generate).unwrap();
        let second = cache.get_or_generate(&key, generate).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);

        let _ = fs::remove_dir_all(cache.root());
    }

    #[test]
    fn test_mismatched_fingerprint_is_stale() {
        let cache = TextureCache::new(scratch_dir("stale"));
        let old = CacheKey::new("clouds", &1u32).unwrap();
        let new = CacheKey::new("clouds", &2u32).unwrap();
        let old_path = cache.store(&old, &sample_texture()).unwrap();
        // a file copied over the new key's name by hand
        fs::copy(&old_path, cache.path_for(&new)).unwrap();

        assert!(matches!(
            cache.load(&new),
            Err(TerrainError::CacheStale { .. })
        ));

        let fresh = PackedTexture::new(1, 1, 1, 1, vec![9.0]).unwrap();
        let result = cache.get_or_generate(&new, || Ok(fresh.clone())).unwrap();
        assert_eq!(result, fresh);
        assert_eq!(cache.load(&new).unwrap(), Some(fresh));

        let _ = fs::remove_dir_all(cache.root());
    }

    #[test]
    fn test_overflowing_dimensions_are_corrupt() {
        let cache = TextureCache::new(scratch_dir("huge"));
        let key = CacheKey::new("huge", &0u8).unwrap();
        let header = CacheHeader {
            magic: MAGIC,
            fingerprint: key.fingerprint(),
            width: u32::MAX,
            height: u32::MAX,
            layers: u32::MAX,
            channels: u32::MAX,
        };
        fs::create_dir_all(cache.root()).unwrap();
        fs::write(cache.path_for(&key), bytemuck::bytes_of(&header)).unwrap();

        assert!(matches!(
            cache.load(&key),
            Err(TerrainError::CacheCorrupt { .. })
        ));
        let fresh = PackedTexture::new(1, 1, 1, 1, vec![2.0]).unwrap();
        assert_eq!(cache.get_or_generate(&key, || Ok(fresh.clone())).unwrap(), fresh);

        let _ = fs::remove_dir_all(cache.root());
    }

    #[test]
    fn test_truncated_file_is_corrupt() {
        let cache = TextureCache::new(scratch_dir("corrupt"));
        let key = CacheKey::new("short", &0u8).unwrap();
        let path = cache.store(&key, &sample_texture()).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        assert!(matches!(
            cache.load(&key),
            Err(TerrainError::CacheCorrupt { .. })
        ));

        let _ = fs::remove_dir_all(cache.root());
    }
}
