//! Layered coherent noise over 2D and 3D lattices.
//!
//! Every generator sums `octaves` layers of a seeded lattice noise. Layer `k`
//! is sampled at `base_frequency * lacunarity^k` and weighted by
//! `persistence^k`. Sample coordinates are normalised to the field extent, so
//! `base_frequency` counts lattice periods across the whole field.

use noise::{NoiseFn, Perlin, Value};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::field::{ScalarField2D, ScalarField3D};

/// Shifts each octave onto a different region of the lattice so layers do
/// not share zero crossings
const OCTAVE_OFFSET: f64 = 37.173;

/// A seeded lattice noise that can be sampled in two and three dimensions
pub trait CoherentNoise {
    fn sample_2d(&self, point: [f64; 2]) -> f64;
    fn sample_3d(&self, point: [f64; 3]) -> f64;
}

impl<T> CoherentNoise for T
where
    T: NoiseFn<f64, 2> + NoiseFn<f64, 3>,
{
    fn sample_2d(&self, point: [f64; 2]) -> f64 {
        NoiseFn::<f64, 2>::get(self, point)
    }

    fn sample_3d(&self, point: [f64; 3]) -> f64 {
        NoiseFn::<f64, 3>::get(self, point)
    }
}

/// Which lattice interpolation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    /// Gradient noise
    #[default]
    Perlin,
    /// Smoothly interpolated random lattice values
    Value,
}

impl NoiseKind {
    pub fn source(self, seed: u32) -> Box<dyn CoherentNoise> {
        match self {
            NoiseKind::Perlin => Box::new(Perlin::new(seed)),
            NoiseKind::Value => Box::new(Value::new(seed)),
        }
    }
}

/// Parameters of a layered noise field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParameters {
    pub kind: NoiseKind,
    /// Lattice periods across the field for the first octave
    pub base_frequency: f64,
    /// Amplitude multiplier between successive octaves
    pub persistence: f64,
    /// Frequency multiplier between successive octaves
    pub lacunarity: f64,
    pub octaves: u32,
    pub seed: u32,
}

impl Default for NoiseParameters {
    fn default() -> Self {
        NoiseParameters {
            kind: NoiseKind::Perlin,
            base_frequency: 4.0,
            persistence: 0.5,
            lacunarity: 2.0,
            octaves: 4,
            seed: 0,
        }
    }
}

impl NoiseParameters {
    pub fn new(
        base_frequency: f64,
        persistence: f64,
        lacunarity: f64,
        octaves: u32,
        seed: u32,
    ) -> Self {
        NoiseParameters {
            kind: NoiseKind::Perlin,
            base_frequency,
            persistence,
            lacunarity,
            octaves,
            seed,
        }
    }

    pub fn with_kind(mut self, kind: NoiseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.octaves == 0 {
            return Err(TerrainError::invalid("octave count must be at least 1"));
        }
        if !(self.base_frequency.is_finite() && self.base_frequency > 0.0) {
            return Err(TerrainError::invalid(format!(
                "base frequency must be positive, got {}",
                self.base_frequency
            )));
        }
        if !(self.lacunarity.is_finite() && self.lacunarity > 0.0) {
            return Err(TerrainError::invalid(format!(
                "lacunarity must be positive, got {}",
                self.lacunarity
            )));
        }
        if !self.persistence.is_finite() {
            return Err(TerrainError::invalid(format!(
                "persistence must be finite, got {}",
                self.persistence
            )));
        }
        Ok(())
    }

    /// (frequency, amplitude, offset) for each octave
    fn octave_layers(&self) -> Vec<(f64, f64, f64)> {
        let mut frequency = self.base_frequency;
        let mut amplitude = 1.0;
        let mut layers = Vec::with_capacity(self.octaves as usize);
        for k in 0..self.octaves {
            layers.push((frequency, amplitude, k as f64 * OCTAVE_OFFSET));
            amplitude *= self.persistence;
            frequency *= self.lacunarity;
        }
        layers
    }
}

fn check_dims(dims: &[usize]) -> Result<()> {
    if dims.iter().any(|d| *d == 0) {
        return Err(TerrainError::invalid(format!(
            "field dimensions must be positive, got {dims:?}"
        )));
    }
    Ok(())
}

/// Generate a 2D field with the noise strategy named in `params`
pub fn generate_2d(width: usize, height: usize, params: &NoiseParameters) -> Result<ScalarField2D> {
    let source = params.kind.source(params.seed);
    generate_2d_with(source.as_ref(), width, height, params)
}

/// Generate a 2D field from a caller-supplied noise source
///
/// `params.kind` and `params.seed` are ignored; the source already embodies them.
pub fn generate_2d_with(
    source: &dyn CoherentNoise,
    width: usize,
    height: usize,
    params: &NoiseParameters,
) -> Result<ScalarField2D> {
    check_dims(&[width, height])?;
    params.validate()?;

    let layers = params.octave_layers();
    let mut values = Vec::with_capacity(width * height);
    for y in 0..height {
        let v = y as f64 / height as f64;
        for x in 0..width {
            let u = x as f64 / width as f64;
            let total: f64 = layers
                .iter()
                .map(|(frequency, amplitude, offset)| {
                    amplitude * source.sample_2d([u * frequency + offset, v * frequency + offset])
                })
                .sum();
            values.push(total as f32);
        }
    }
    ScalarField2D::from_values(width, height, values)
}

/// Generate a 3D field with the noise strategy named in `params`
pub fn generate_3d(
    width: usize,
    height: usize,
    depth: usize,
    params: &NoiseParameters,
) -> Result<ScalarField3D> {
    let source = params.kind.source(params.seed);
    generate_3d_with(source.as_ref(), width, height, depth, params)
}

/// Generate a 3D field from a caller-supplied noise source
pub fn generate_3d_with(
    source: &dyn CoherentNoise,
    width: usize,
    height: usize,
    depth: usize,
    params: &NoiseParameters,
) -> Result<ScalarField3D> {
    check_dims(&[width, height, depth])?;
    params.validate()?;

    let layers = params.octave_layers();
    let mut values = Vec::with_capacity(width * height * depth);
    for z in 0..depth {
        let w = z as f64 / depth as f64;
        for y in 0..height {
            let v = y as f64 / height as f64;
            for x in 0..width {
                let u = x as f64 / width as f64;
                let total: f64 = layers
                    .iter()
                    .map(|(frequency, amplitude, offset)| {
                        amplitude
                            * source.sample_3d([
                                u * frequency + offset,
                                v * frequency + offset,
                                w * frequency + offset,
                            ])
                    })
                    .sum();
                values.push(total as f32);
            }
        }
    }
    ScalarField3D::from_values(width, height, depth, values)
}
