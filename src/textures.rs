//! Procedural ground-cover textures for the island
//!
//! Albedo layers and tangent-space normal maps are built from multi-octave
//! Perlin noise sampled on a torus, so every texture tiles seamlessly.

use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::packing::PackedTexture;

/// Tangent-space "straight up" normal used for the flat ground-cover layer
pub const FLAT_NORMAL: [u8; 4] = [127, 127, 255, 0];

/// Surface materials of the island, in texture-array layer order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundCover {
    Sand,
    Grass,
    Snow,
    Cliff,
}

impl GroundCover {
    pub const ALL: [GroundCover; 4] = [
        GroundCover::Sand,
        GroundCover::Grass,
        GroundCover::Snow,
        GroundCover::Cliff,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GroundCover::Sand => "sand",
            GroundCover::Grass => "grass",
            GroundCover::Snow => "snow",
            GroundCover::Cliff => "cliff",
        }
    }

    fn palette(self) -> Palette {
        match self {
            GroundCover::Sand => Palette {
                stops: [
                    [150.0, 130.0, 95.0],
                    [194.0, 173.0, 128.0],
                    [214.0, 196.0, 150.0],
                    [236.0, 222.0, 184.0],
                ],
                breaks: [0.3, 0.65],
                detail: 0.15,
                seed_offset: 17,
                z_offset: 30.0,
            },
            GroundCover::Grass => Palette {
                stops: [
                    [30.0, 60.0, 20.0],
                    [50.0, 100.0, 30.0],
                    [80.0, 140.0, 50.0],
                    [120.0, 150.0, 60.0],
                ],
                breaks: [0.25, 0.6],
                detail: 0.3,
                seed_offset: 123,
                z_offset: 5.0,
            },
            GroundCover::Snow => Palette {
                stops: [
                    [200.0, 205.0, 215.0],
                    [220.0, 230.0, 240.0],
                    [235.0, 240.0, 248.0],
                    [250.0, 250.0, 255.0],
                ],
                breaks: [0.2, 0.5],
                detail: 0.05,
                seed_offset: 789,
                z_offset: 20.0,
            },
            GroundCover::Cliff => Palette {
                stops: [
                    [60.0, 55.0, 50.0],
                    [100.0, 95.0, 85.0],
                    [120.0, 100.0, 70.0],
                    [140.0, 135.0, 125.0],
                ],
                breaks: [0.3, 0.6],
                detail: 0.2,
                seed_offset: 42,
                z_offset: 0.0,
            },
        }
    }
}

/// Colour ramp and noise placement for one material
struct Palette {
    /// Four colours in 0-255, dark to light
    stops: [[f32; 3]; 4],
    /// Noise values where the ramp moves from the first to the second and from
    /// the second to the third segment
    breaks: [f32; 2],
    /// Brightness jitter added by the fine detail noise
    detail: f32,
    seed_offset: u32,
    z_offset: f64,
}

impl Palette {
    fn colour(&self, value: f32) -> [f32; 3] {
        let [b0, b1] = self.breaks;
        if value < b0 {
            blend_colors(&self.stops[0], &self.stops[1], value / b0)
        } else if value < b1 {
            blend_colors(&self.stops[1], &self.stops[2], (value - b0) / (b1 - b0))
        } else {
            blend_colors(&self.stops[2], &self.stops[3], (value - b1) / (1.0 - b1))
        }
    }
}

const ALBEDO_OCTAVES: u32 = 5;
const NORMAL_OCTAVES: u32 = 5;

/// Encode a tangent-space normal as RGBA bytes
///
/// Components map from [-1, 1] to [0, 255]; (0, 0, 1) encodes to
/// (128, 128, 255). Alpha is always 255.
fn encode_tangent_normal(nx: f32, ny: f32, nz: f32) -> [u8; 4] {
    // Normalize the input vector
    let length = (nx * nx + ny * ny + nz * nz).sqrt();
    let (nx, ny, nz) = if length > 0.0 {
        (nx / length, ny / length, nz / length)
    } else {
        (0.0, 0.0, 1.0)
    };

    // Map [-1, 1] to [0, 255] with rounding
    let encode = |c: f32| ((c + 1.0) / 2.0 * 255.0).round().clamp(0.0, 255.0) as u8;
    [encode(nx), encode(ny), encode(nz), 255]
}

/// fBm with persistence 0.5 and lacunarity 2, sampled in the plane `z`
fn sample_height_noise(perlin: &Perlin, x: f64, y: f64, z: f64, octaves: u32) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    for _ in 0..octaves {
        total += amplitude * perlin.get([x * frequency, y * frequency, z]);
        amplitude *= 0.5; // Persistence
        frequency *= 2.0; // Lacunarity
    }
    total
}

/// Map a texel to the noise plane so that opposite edges meet
///
/// Both axes are wrapped onto circles; the coordinates repeat with period
/// `size` in x and y.
fn torus_coords(x: usize, y: usize, size: usize) -> (f64, f64) {
    use std::f64::consts::PI;

    // One full turn per texture width and height
    let angle_u = x as f64 / size as f64 * 2.0 * PI;
    let angle_v = y as f64 / size as f64 * 2.0 * PI;

    (
        angle_u.cos() + angle_v.cos() * 0.5,
        angle_u.sin() + angle_v.sin() * 0.5,
    )
}

/// Central-difference gradient of the height noise at a torus point
fn torus_gradient(
    perlin: &Perlin,
    nx: f64,
    ny: f64,
    z_offset: f64,
    epsilon: f64,
    strength: f32,
) -> (f32, f32) {
    let h = |x: f64, y: f64| sample_height_noise(perlin, x, y, z_offset, NORMAL_OCTAVES);
    let du = ((h(nx + epsilon, ny) - h(nx - epsilon, ny)) / (2.0 * epsilon)) as f32 * strength;
    let dv = ((h(nx, ny + epsilon) - h(nx, ny - epsilon)) / (2.0 * epsilon)) as f32 * strength;
    (du, dv)
}

fn blend_colors(color1: &[f32; 3], color2: &[f32; 3], t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        color1[0] * (1.0 - t) + color2[0] * t,
        color1[1] * (1.0 - t) + color2[1] * t,
        color1[2] * (1.0 - t) + color2[2] * t,
    ]
}

fn check_size(size: usize) -> Result<()> {
    if size == 0 {
        return Err(TerrainError::invalid("texture size must be positive"));
    }
    Ok(())
}

/// Generate a tileable RGBA albedo layer for `cover`
///
/// # Arguments
/// * `cover` - Material whose palette is used
/// * `size` - Width and height in texels
/// * `seed` - Base noise seed; each material offsets it so layers differ
pub fn generate_albedo(cover: GroundCover, size: usize, seed: u32) -> Result<PackedTexture<u8>> {
    check_size(size)?;
    let palette = cover.palette();
    let perlin = Perlin::new(seed.wrapping_add(palette.seed_offset));
    let mut data = Vec::with_capacity(size * size * 4);

    for y in 0..size {
        for x in 0..size {
            // Use torus topology for seamless tiling
            let (nx, ny) = torus_coords(x, y, size);

            // Multi-octave noise, normalized to 0-1
            let value = sample_height_noise(&perlin, nx, ny, palette.z_offset, ALBEDO_OCTAVES);
            let value = ((value + 1.0) / 2.0) as f32;

            // Finer noise layer for texture variation
            let detail = perlin.get([nx * 8.0, ny * 8.0, palette.z_offset + 10.0]);
            let detail = ((detail + 1.0) / 2.0) as f32;
            let shade = 1.0 - palette.detail / 2.0 + detail * palette.detail;

            // Blend the palette and apply the detail variation
            let colour = palette.colour(value);
            for c in colour {
                data.push((c * shade).clamp(0.0, 255.0) as u8);
            }
            data.push(255);
        }
    }

    PackedTexture::new(size, size, 1, 4, data)
}

/// Generate a tileable tangent-space bump map for `cover`
///
/// The bumps follow the same noise as the material's albedo, so light and
/// colour line up.
///
/// # Arguments
/// * `cover` - Material whose noise is differentiated
/// * `size` - Width and height in texels
/// * `seed` - Base noise seed, as passed to [`generate_albedo`]
/// * `strength` - Gradient multiplier; larger values give deeper bumps
pub fn generate_normal_map(
    cover: GroundCover,
    size: usize,
    seed: u32,
    strength: f32,
) -> Result<PackedTexture<u8>> {
    check_size(size)?;
    if !strength.is_finite() {
        return Err(TerrainError::invalid(format!(
            "normal strength must be finite, got {strength}"
        )));
    }
    let palette = cover.palette();
    let perlin = Perlin::new(seed.wrapping_add(palette.seed_offset));
    let epsilon = 1.0 / size as f64;
    let mut data = Vec::with_capacity(size * size * 4);

    for y in 0..size {
        for x in 0..size {
            let (nx, ny) = torus_coords(x, y, size);
            // Height gradient by central difference
            let (du, dv) = torus_gradient(&perlin, nx, ny, palette.z_offset, epsilon, strength);
            // Tangent-space normal (-du, -dv, 1), normalized on encode
            data.extend_from_slice(&encode_tangent_normal(-du, -dv, 1.0));
        }
    }

    PackedTexture::new(size, size, 1, 4, data)
}

/// A normal map with every texel set to [`FLAT_NORMAL`]
pub fn flat_normal_map(size: usize) -> Result<PackedTexture<u8>> {
    check_size(size)?;
    PackedTexture::filled(size, size, &FLAT_NORMAL)
}
