use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::packing::{PackedTexture, to_layered_array};
use crate::textures::{GroundCover, flat_normal_map, generate_albedo, generate_normal_map};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundCoverConfig {
    /// Width and height shared by every layer
    pub layer_size: usize,
    pub seed: u32,
    pub normal_strength: f32,
    pub sand: Option<PathBuf>,
    pub grass: Option<PathBuf>,
    pub snow: Option<PathBuf>,
    pub cliff: Option<PathBuf>,
    pub sand_bump: Option<PathBuf>,
    pub cliff_bump: Option<PathBuf>,
}

impl Default for GroundCoverConfig {
    fn default() -> Self {
        GroundCoverConfig {
            layer_size: 256,
            seed: 0,
            normal_strength: 1.0,
            sand: Some("textures/sand.jpg".into()),
            grass: Some("textures/grass.tga".into()),
            snow: Some("textures/snow.tga".into()),
            cliff: Some("textures/rockface.jpg".into()),
            sand_bump: Some("textures/sandBump.jpg".into()),
            cliff_bump: Some("textures/rockfaceBump.jpg".into()),
        }
    }
}

impl GroundCoverConfig {
    fn albedo_path(&self, cover: GroundCover) -> Option<&Path> {
        match cover {
            GroundCover::Sand => self.sand.as_deref(),
            GroundCover::Grass => self.grass.as_deref(),
            GroundCover::Snow => self.snow.as_deref(),
            GroundCover::Cliff => self.cliff.as_deref(),
        }
    }
}

/// Layered albedo and normal arrays for the island shader
///
/// Layer `i` of both arrays belongs to `GroundCover::ALL[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundCoverSet {
    pub albedo: PackedTexture<u8>,
    pub normals: PackedTexture<u8>,
}

/// Which bump map each material's normal layer uses
///
/// Grass is flat and snow reuses the sand bumps.
fn normal_source(cover: GroundCover) -> Option<GroundCover> {
    match cover {
        GroundCover::Sand | GroundCover::Snow => Some(GroundCover::Sand),
        GroundCover::Grass => None,
        GroundCover::Cliff => Some(GroundCover::Cliff),
    }
}

/// Read an RGBA layer from disk, resized to `size` x `size`
///
/// Returns `None` when the file does not exist so the caller can fall back to
/// a procedural layer.
fn load_layer(path: &Path, size: usize) -> Result<Option<PackedTexture<u8>>> {
    if !path.exists() {
        log::debug!("{} not found, using a procedural layer", path.display());
        return Ok(None);
    }
    let mut rgba = image::open(path)?.to_rgba8();
    let side = size as u32;
    if rgba.dimensions() != (side, side) {
        log::info!(
            "resizing {} from {}x{} to {side}x{side}",
            path.display(),
            rgba.width(),
            rgba.height()
        );
        rgba = imageops::resize(&rgba, side, side, FilterType::Triangle);
    }
    log::info!("loaded ground cover layer {}", path.display());
    Ok(Some(PackedTexture::from_rgba_image(&rgba)))
}

fn layer_or_else<F>(path: Option<&Path>, size: usize, fallback: F) -> Result<PackedTexture<u8>>
where
    F: FnOnce() -> Result<PackedTexture<u8>>,
{
    match path {
        Some(path) => match load_layer(path, size)? {
            Some(layer) => Ok(layer),
            None => fallback(),
        },
        None => fallback(),
    }
}

/// Build the four albedo and four normal layers and stack each set
pub fn compose_ground_cover(config: &GroundCoverConfig) -> Result<GroundCoverSet> {
    let size = config.layer_size;

    let albedo_layers = GroundCover::ALL
        .iter()
        .map(|&cover| {
            layer_or_else(config.albedo_path(cover), size, || {
                generate_albedo(cover, size, config.seed)
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let sand_bump = layer_or_else(config.sand_bump.as_deref(), size, || {
        generate_normal_map(GroundCover::Sand, size, config.seed, config.normal_strength)
    })?;
    let cliff_bump = layer_or_else(config.cliff_bump.as_deref(), size, || {
        generate_normal_map(GroundCover::Cliff, size, config.seed, config.normal_strength)
    })?;
    let flat = flat_normal_map(size)?;

    let normal_layers: Vec<PackedTexture<u8>> = GroundCover::ALL
        .iter()
        .map(|&cover| match normal_source(cover) {
            Some(GroundCover::Cliff) => cliff_bump.clone(),
            Some(_) => sand_bump.clone(),
            None => flat.clone(),
        })
        .collect();

    Ok(GroundCoverSet {
        albedo: to_layered_array(&albedo_layers)?,
        normals: to_layered_array(&normal_layers)?,
    })
}
