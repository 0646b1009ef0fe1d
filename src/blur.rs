use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::field::{Field, ScalarField2D, ScalarField3D};
use crate::packing::PackedTexture;

/// How the blur kernel treats samples past the field edge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMode {
    /// Reuse the nearest valid sample
    #[default]
    Clamp,
    /// Wrap to the opposite edge, for periodic fields
    Wrap,
}

impl EdgeMode {
    fn resolve(self, i: isize, len: usize) -> usize {
        match self {
            EdgeMode::Clamp => i.clamp(0, len as isize - 1) as usize,
            EdgeMode::Wrap => i.rem_euclid(len as isize) as usize,
        }
    }
}

/// One 3x3 box pass over an interleaved plane of `channels` samples per texel
fn box_pass_2d(
    src: &[f32],
    width: usize,
    height: usize,
    channels: usize,
    edges: EdgeMode,
) -> Vec<f32> {
    let mut dst = vec![0.0; src.len()];
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0;
                for dy in -1..=1isize {
                    let ny = edges.resolve(y as isize + dy, height);
                    for dx in -1..=1isize {
                        let nx = edges.resolve(x as isize + dx, width);
                        sum += src[(ny * width + nx) * channels + c];
                    }
                }
                dst[(y * width + x) * channels + c] = sum / 9.0;
            }
        }
    }
    dst
}

/// One 3x3x3 box pass over a single-channel volume
fn box_pass_3d(src: &[f32], width: usize, height: usize, depth: usize, edges: EdgeMode) -> Vec<f32> {
    let mut dst = vec![0.0; src.len()];
    for z in 0..depth {
        for y in 0..height {
            for x in 0..width {
                let mut sum = 0.0;
                for dz in -1..=1isize {
                    let nz = edges.resolve(z as isize + dz, depth);
                    for dy in -1..=1isize {
                        let ny = edges.resolve(y as isize + dy, height);
                        for dx in -1..=1isize {
                            let nx = edges.resolve(x as isize + dx, width);
                            sum += src[(nz * height + ny) * width + nx];
                        }
                    }
                }
                dst[(z * height + y) * width + x] = sum / 27.0;
            }
        }
    }
    dst
}

/// Smooth a 2D field in place with `passes` box-kernel passes
pub fn smooth_2d(field: &mut ScalarField2D, passes: usize, edges: EdgeMode) {
    let (width, height) = (field.width(), field.height());
    for _ in 0..passes {
        let smoothed = box_pass_2d(field.values(), width, height, 1, edges);
        field.values_mut().copy_from_slice(&smoothed);
    }
}

/// Smooth a 3D field in place with `passes` box-kernel passes
pub fn smooth_3d(field: &mut ScalarField3D, passes: usize, edges: EdgeMode) {
    let (width, height, depth) = (field.width(), field.height(), field.depth());
    for _ in 0..passes {
        let smoothed = box_pass_3d(field.values(), width, height, depth, edges);
        field.values_mut().copy_from_slice(&smoothed);
    }
}

/// Apply a box blur to a packed 2D image in place
///
/// * `texture` - Single-layer texture, every channel is blurred independently
/// * `passes` - Number of 3x3 passes; edges clamp to the nearest texel
pub fn box_blur(texture: &mut PackedTexture<f32>, passes: usize) -> Result<()> {
    if texture.layers() != 1 {
        return Err(TerrainError::mismatch(
            "a single-layer image",
            format!("{} layers", texture.layers()),
        ));
    }
    let (width, height, channels) = (texture.width(), texture.height(), texture.channels());
    for _ in 0..passes {
        let blurred = box_pass_2d(texture.data(), width, height, channels, EdgeMode::Clamp);
        texture.data_mut().copy_from_slice(&blurred);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spike_texture(size: usize) -> PackedTexture<f32> {
        let mut data = vec![0.0; size * size];
        data[(size / 2) * size + size / 2] = 1.0;
        PackedTexture::new(size, size, 1, 1, data).unwrap()
    }

    #[test]
    fn test_box_blur_spreads_spike_and_conserves_total() {
        let mut texture = spike_texture(16);
        box_blur(&mut texture, 3).unwrap();

        let total: f32 = texture.data().iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-5);

        let centre = texture.data()[8 * 16 + 8];
        assert!(centre < 1.0 && centre > 0.0, "Spike should flatten, got {centre}");
        // three passes reach three cells out
        assert!(texture.data()[8 * 16 + 11] > 0.0);
        assert_eq!(texture.data()[8 * 16 + 12], 0.0);
    }

    #[test]
    fn test_box_blur_keeps_channels_separate() {
        let mut data = vec![0.0; 5 * 5 * 2];
        for texel in data.chunks_exact_mut(2) {
            texel[1] = 3.0;
        }
        data[(2 * 5 + 2) * 2] = 9.0;
        let mut texture = PackedTexture::new(5, 5, 1, 2, data).unwrap();
        box_blur(&mut texture, 1).unwrap();

        assert_relative_eq!(texture.texel(2, 2, 0).unwrap()[0], 1.0);
        for texel in texture.data().chunks_exact(2) {
            assert_relative_eq!(texel[1], 3.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_box_blur_rejects_layered_texture() {
        let mut texture = PackedTexture::new(2, 2, 3, 1, vec![0.0; 12]).unwrap();
        assert!(box_blur(&mut texture, 1).is_err());
    }

    #[test]
    fn test_clamped_edges_keep_constant_field() {
        let mut field = ScalarField2D::from_values(4, 3, vec![2.5; 12]).unwrap();
        smooth_2d(&mut field, 5, EdgeMode::Clamp);
        for v in field.values() {
            assert_relative_eq!(*v, 2.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_wrap_conserves_total_at_edges() {
        let mut field = ScalarField2D::new(6, 6).unwrap();
        field.set(0, 0, 1.0).unwrap();

        let mut wrapped = field.clone();
        smooth_2d(&mut wrapped, 2, EdgeMode::Wrap);
        let total: f32 = wrapped.values().iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-5);
        // the corner spike leaks to the far corner only when wrapping
        assert!(wrapped.get(5, 5).unwrap() > 0.0);

        let mut clamped = field;
        smooth_2d(&mut clamped, 2, EdgeMode::Clamp);
        assert_eq!(clamped.get(5, 5), Some(0.0));
    }

    #[test]
    fn test_smooth_3d_spreads_in_all_axes() {
        let mut field = ScalarField3D::new(7, 7, 7).unwrap();
        field.set(3, 3, 3, 27.0).unwrap();
        let mut smoothed = field;
        smooth_3d(&mut smoothed, 1, EdgeMode::Clamp);

        assert_relative_eq!(smoothed.get(3, 3, 3).unwrap(), 1.0);
        assert_relative_eq!(smoothed.get(2, 4, 2).unwrap(), 1.0);
        assert_eq!(smoothed.get(1, 3, 3), Some(0.0));
        let total: f32 = smoothed.values().iter().sum();
        assert_relative_eq!(total, 27.0, epsilon = 1e-4);
    }

    #[test]
    fn test_zero_passes_is_identity() {
        let field = ScalarField2D::from_values(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut smoothed = field.clone();
        smooth_2d(&mut smoothed, 0, EdgeMode::Clamp);
        assert_eq!(smoothed, field);
    }
}
