use std::f32::consts::PI;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::error::{Result, TerrainError};
use crate::packing::PackedTexture;

/// Scatter `count` stars over a square single-channel sky texture
///
/// Stars sit between 5% and 90% of the half-size from the centre, so the dome
/// shader gets a disc of stars with an empty rim. Brightness is drawn from
/// [0.5, 0.9) of full scale. The same seed always gives the same sky.
pub fn generate_star_field(size: usize, count: usize, seed: u64) -> Result<PackedTexture<u8>> {
    if size < 2 {
        return Err(TerrainError::invalid(format!(
            "star field needs at least 2x2 texels, got {size}"
        )));
    }
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let mut data = vec![0u8; size * size];
    let half = size as f32 / 2.0;

    for _ in 0..count {
        let dist: f32 = rng.gen_range(0.05..0.9);
        let angle: f32 = rng.gen_range(0.0..2.0 * PI);
        let x = (half + angle.cos() * dist * half) as usize;
        let y = (half + angle.sin() * dist * half) as usize;
        let brightness = (256.0 * rng.gen_range(0.5f32..0.9)) as u8;
        data[y.min(size - 1) * size + x.min(size - 1)] = brightness;
    }

    PackedTexture::new(size, size, 1, 1, data)
}
