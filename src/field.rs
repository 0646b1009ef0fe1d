use crate::error::{Result, TerrainError};

/// Dense scalar samples that post-processing stages can rewrite in place
pub trait Field {
    fn values(&self) -> &[f32];
    fn values_mut(&mut self) -> &mut [f32];

    /// Smallest and largest sample
    fn range(&self) -> (f32, f32) {
        self.values()
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
    }
}

/// Scalar samples on a `width` x `height` lattice, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField2D {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl ScalarField2D {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Self::from_values(width, height, vec![0.0; width * height])
    }

    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TerrainError::invalid(format!(
                "field dimensions must be positive, got {width}x{height}"
            )));
        }
        if values.len() != width * height {
            return Err(TerrainError::mismatch(
                format!("{} samples", width * height),
                format!("{} samples", values.len()),
            ));
        }
        Ok(ScalarField2D {
            width,
            height,
            values,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x < self.width && y < self.height {
            Some(self.values[y * self.width + x])
        } else {
            None
        }
    }

    /// Overwrite the sample at (x, y)
    pub fn set(&mut self, x: usize, y: usize, value: f32) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(TerrainError::OutOfBounds {
                x: x as i64,
                z: y as i64,
                width: self.width,
                depth: self.height,
            });
        }
        self.values[y * self.width + x] = value;
        Ok(())
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

impl Field for ScalarField2D {
    fn values(&self) -> &[f32] {
        &self.values
    }

    fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }
}

/// Scalar samples on a `width` x `height` x `depth` lattice
///
/// Slices along z are stored one after another, each row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField3D {
    width: usize,
    height: usize,
    depth: usize,
    values: Vec<f32>,
}

impl ScalarField3D {
    pub fn new(width: usize, height: usize, depth: usize) -> Result<Self> {
        Self::from_values(width, height, depth, vec![0.0; width * height * depth])
    }

    pub fn from_values(width: usize, height: usize, depth: usize, values: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 || depth == 0 {
            return Err(TerrainError::invalid(format!(
                "field dimensions must be positive, got {width}x{height}x{depth}"
            )));
        }
        if values.len() != width * height * depth {
            return Err(TerrainError::mismatch(
                format!("{} samples", width * height * depth),
                format!("{} samples", values.len()),
            ));
        }
        Ok(ScalarField3D {
            width,
            height,
            depth,
            values,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        if x < self.width && y < self.height && z < self.depth {
            Some(self.values[(z * self.height + y) * self.width + x])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) -> Result<()> {
        if x >= self.width || y >= self.height || z >= self.depth {
            return Err(TerrainError::VolumeOutOfBounds {
                x,
                y,
                z,
                width: self.width,
                height: self.height,
                depth: self.depth,
            });
        }
        self.values[(z * self.height + y) * self.width + x] = value;
        Ok(())
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

impl Field for ScalarField3D {
    fn values(&self) -> &[f32] {
        &self.values
    }

    fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }
}
