//! Texture-ready buffers produced from fields and images.

use image::{DynamicImage, GrayImage, RgbaImage};

use crate::error::{Result, TerrainError};
use crate::field::{Field, ScalarField2D, ScalarField3D};

/// Colour written to the RGB channels of cloud textures
pub const CLOUD_RGB: [f32; 3] = [1.0, 1.0, 1.0];

/// An interleaved texel buffer of `width` x `height` x `layers`
///
/// A single-layer texture is a plain 2D image. More layers make either a 3D
/// volume or a layered array, depending on how the consumer samples it.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedTexture<T> {
    width: usize,
    height: usize,
    layers: usize,
    channels: usize,
    data: Vec<T>,
}

impl<T: Copy> PackedTexture<T> {
    pub fn new(
        width: usize,
        height: usize,
        layers: usize,
        channels: usize,
        data: Vec<T>,
    ) -> Result<Self> {
        if width == 0 || height == 0 || layers == 0 || channels == 0 {
            return Err(TerrainError::invalid(format!(
                "texture dimensions must be positive, got {width}x{height}x{layers} with {channels} channels"
            )));
        }
        let expected = width * height * layers * channels;
        if data.len() != expected {
            return Err(TerrainError::mismatch(
                format!("{expected} texel values"),
                format!("{}", data.len()),
            ));
        }
        Ok(PackedTexture {
            width,
            height,
            layers,
            channels,
            data,
        })
    }

    /// A texture with every texel set to `texel`
    pub fn filled(width: usize, height: usize, texel: &[T]) -> Result<Self> {
        let data = texel
            .iter()
            .copied()
            .cycle()
            .take(width * height * texel.len())
            .collect();
        Self::new(width, height, 1, texel.len(), data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layers(&self) -> usize {
        self.layers
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    fn layer_len(&self) -> usize {
        self.width * self.height * self.channels
    }

    /// The channels of one texel
    pub fn texel(&self, x: usize, y: usize, layer: usize) -> Option<&[T]> {
        if x >= self.width || y >= self.height || layer >= self.layers {
            return None;
        }
        let start = layer * self.layer_len() + (y * self.width + x) * self.channels;
        Some(&self.data[start..start + self.channels])
    }

    /// All texels of one layer
    pub fn layer(&self, layer: usize) -> Option<&[T]> {
        if layer >= self.layers {
            return None;
        }
        let len = self.layer_len();
        Some(&self.data[layer * len..(layer + 1) * len])
    }

    /// Copy one layer out as a standalone 2D texture
    pub fn layer_texture(&self, layer: usize) -> Result<Self> {
        let data = self
            .layer(layer)
            .ok_or_else(|| {
                TerrainError::invalid(format!("layer {layer} of {} does not exist", self.layers))
            })?
            .to_vec();
        Self::new(self.width, self.height, 1, self.channels, data)
    }

    fn describe(&self) -> String {
        format!(
            "{}x{} with {} channels",
            self.width, self.height, self.channels
        )
    }
}

/// Stack equally sized 2D images into one layered array
///
/// Layer order follows `images`. Every image must be single-layer and match
/// the first image's size and channel count.
pub fn to_layered_array<T: Copy>(images: &[PackedTexture<T>]) -> Result<PackedTexture<T>> {
    let first = images
        .first()
        .ok_or_else(|| TerrainError::invalid("layered array needs at least one image"))?;
    for (i, image) in images.iter().enumerate() {
        if image.layers != 1 {
            return Err(TerrainError::mismatch(
                "single-layer images",
                format!("image {i} has {} layers", image.layers),
            ));
        }
        if image.width != first.width
            || image.height != first.height
            || image.channels != first.channels
        {
            return Err(TerrainError::mismatch(
                first.describe(),
                format!("image {i} is {}", image.describe()),
            ));
        }
    }

    let mut data = Vec::with_capacity(first.data.len() * images.len());
    for image in images {
        data.extend_from_slice(&image.data);
    }
    PackedTexture::new(first.width, first.height, images.len(), first.channels, data)
}

/// Single-channel float texture holding the field samples
pub fn pack_luminance_2d(field: &ScalarField2D) -> PackedTexture<f32> {
    PackedTexture {
        width: field.width(),
        height: field.height(),
        layers: 1,
        channels: 1,
        data: field.values().to_vec(),
    }
}

fn rgba_with_alpha(values: &[f32], rgb: [f32; 3]) -> Vec<f32> {
    values
        .iter()
        .flat_map(|v| [rgb[0], rgb[1], rgb[2], *v])
        .collect()
}

/// RGBA float texture with `rgb` in the colour channels and the field in alpha
pub fn pack_rgba_alpha_2d(field: &ScalarField2D, rgb: [f32; 3]) -> PackedTexture<f32> {
    PackedTexture {
        width: field.width(),
        height: field.height(),
        layers: 1,
        channels: 4,
        data: rgba_with_alpha(field.values(), rgb),
    }
}

/// 3D variant of [`pack_rgba_alpha_2d`]; the field depth becomes the layer count
pub fn pack_rgba_alpha_3d(field: &ScalarField3D, rgb: [f32; 3]) -> PackedTexture<f32> {
    PackedTexture {
        width: field.width(),
        height: field.height(),
        layers: field.depth(),
        channels: 4,
        data: rgba_with_alpha(field.values(), rgb),
    }
}

impl PackedTexture<u8> {
    pub fn from_rgba_image(image: &RgbaImage) -> Self {
        PackedTexture {
            width: image.width() as usize,
            height: image.height() as usize,
            layers: 1,
            channels: 4,
            data: image.as_raw().clone(),
        }
    }

    /// Reduce to one channel by averaging the colour channels
    ///
    /// Alpha, when present, is ignored.
    pub fn to_luminance(&self) -> Self {
        let colour = match self.channels {
            1 | 2 => 1,
            4 => 3,
            n => n,
        };
        let data = self
            .data
            .chunks_exact(self.channels)
            .map(|texel| {
                let sum: u32 = texel[..colour].iter().map(|c| *c as u32).sum();
                ((sum + colour as u32 / 2) / colour as u32) as u8
            })
            .collect();
        PackedTexture {
            width: self.width,
            height: self.height,
            layers: self.layers,
            channels: 1,
            data,
        }
    }

    /// Convert to floats, keeping the 0-255 scale
    pub fn to_f32(&self) -> PackedTexture<f32> {
        PackedTexture {
            width: self.width,
            height: self.height,
            layers: self.layers,
            channels: self.channels,
            data: self.data.iter().map(|v| *v as f32).collect(),
        }
    }

    /// One layer as an image, for dumping to disk
    pub fn layer_image(&self, layer: usize) -> Result<DynamicImage> {
        let data = self
            .layer(layer)
            .ok_or_else(|| TerrainError::invalid(format!("layer {layer} does not exist")))?
            .to_vec();
        let (w, h) = (self.width as u32, self.height as u32);
        let image = match self.channels {
            1 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
            4 => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
            n => {
                return Err(TerrainError::invalid(format!(
                    "cannot build an image from {n} channels"
                )));
            }
        };
        image.ok_or_else(|| TerrainError::invalid("texel buffer does not fill the image"))
    }
}

impl PackedTexture<f32> {
    /// Quantise [0, 1] floats to bytes; values outside are clamped
    pub fn to_u8(&self) -> PackedTexture<u8> {
        PackedTexture {
            width: self.width,
            height: self.height,
            layers: self.layers,
            channels: self.channels,
            data: self
                .data
                .iter()
                .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_alpha_packing_2d() {
        let field = ScalarField2D::from_values(2, 1, vec![0.25, 0.75]).unwrap();
        let texture = pack_rgba_alpha_2d(&field, CLOUD_RGB);
        assert_eq!(texture.channels(), 4);
        assert_eq!(texture.layers(), 1);
        assert_eq!(texture.texel(0, 0, 0), Some(&[1.0, 1.0, 1.0, 0.25][..]));
        assert_eq!(texture.texel(1, 0, 0), Some(&[1.0, 1.0, 1.0, 0.75][..]));
    }

    #[test]
    fn test_rgba_alpha_packing_3d_uses_depth_as_layers() {
        let mut field = ScalarField3D::new(2, 2, 3).unwrap();
        field.set(1, 0, 2, 0.5).unwrap();
        let texture = pack_rgba_alpha_3d(&field, [0.2, 0.4, 0.6]);
        assert_eq!(
            (texture.width(), texture.height(), texture.layers()),
            (2, 2, 3)
        );
        assert_eq!(texture.texel(1, 0, 2), Some(&[0.2, 0.4, 0.6, 0.5][..]));
        assert_eq!(texture.texel(0, 0, 3), None);
    }

    #[test]
    fn test_luminance_packing() {
        let field = ScalarField2D::from_values(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let texture = pack_luminance_2d(&field);
        assert_eq!(texture.channels(), 1);
        assert_eq!(texture.data(), field.values());
    }

    #[test]
    fn test_layered_array_stacks_in_order() {
        let a = PackedTexture::filled(2, 2, &[1u8, 2, 3, 4]).unwrap();
        let b = PackedTexture::filled(2, 2, &[5u8, 6, 7, 8]).unwrap();
        let array = to_layered_array(&[a.clone(), b.clone()]).unwrap();

        assert_eq!(array.layers(), 2);
        assert_eq!(array.channels(), 4);
        assert_eq!(array.layer(0), Some(a.data()));
        assert_eq!(array.layer(1), Some(b.data()));
        assert_eq!(array.layer_texture(1).unwrap(), b);
    }

    #[test]
    fn test_layered_array_rejects_mismatched_sizes() {
        let a = PackedTexture::filled(4, 4, &[0u8; 4]).unwrap();
        let b = PackedTexture::filled(4, 2, &[0u8; 4]).unwrap();
        let c = PackedTexture::filled(4, 4, &[0u8; 3]).unwrap();

        assert!(matches!(
            to_layered_array(&[a.clone(), b]),
            Err(TerrainError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            to_layered_array(&[a, c]),
            Err(TerrainError::DimensionMismatch { .. })
        ));
        assert!(to_layered_array::<u8>(&[]).is_err());
    }

    #[test]
    fn test_luminance_and_float_conversion() {
        let rgba = RgbaImage::from_raw(2, 1, vec![30, 60, 90, 255, 255, 255, 255, 0]).unwrap();
        let texture = PackedTexture::from_rgba_image(&rgba);
        let lum = texture.to_luminance();
        assert_eq!(lum.channels(), 1);
        assert_eq!(lum.data(), &[60, 255]);

        let floats = lum.to_f32();
        assert_eq!(floats.data(), &[60.0, 255.0]);
    }

    #[test]
    fn test_quantise_and_dump_layer() {
        let texture = PackedTexture::new(2, 1, 1, 1, vec![-0.5f32, 0.5]).unwrap();
        let bytes = texture.to_u8();
        assert_eq!(bytes.data(), &[0, 128]);

        let image = bytes.layer_image(0).unwrap();
        assert_eq!(image.width(), 2);
        assert!(bytes.layer_image(1).is_err());
    }

    #[test]
    fn test_new_validates_length() {
        assert!(PackedTexture::new(2, 2, 1, 1, vec![0u8; 3]).is_err());
        assert!(PackedTexture::new(0, 2, 1, 1, Vec::<u8>::new()).is_err());
    }
}
