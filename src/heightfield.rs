use crate::error::{Result, TerrainError};
use crate::packing::PackedTexture;

/// A 2D grid of terrain elevations, addressed by (x, z)
///
/// Rows run along z, so cell (x, z) lives at `z * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    width: usize,
    depth: usize,
    cells: Vec<f32>,
}

impl HeightGrid {
    /// Create a grid with every cell set to `fill`
    pub fn new(width: usize, depth: usize, fill: f32) -> Result<Self> {
        if width == 0 || depth == 0 {
            return Err(TerrainError::invalid(format!(
                "height grid must be non-empty, got {width}x{depth}"
            )));
        }
        Ok(HeightGrid {
            width,
            depth,
            cells: vec![fill; width * depth],
        })
    }

    /// Wrap an existing row-major buffer of `width * depth` heights
    pub fn from_values(width: usize, depth: usize, cells: Vec<f32>) -> Result<Self> {
        if width == 0 || depth == 0 {
            return Err(TerrainError::invalid(format!(
                "height grid must be non-empty, got {width}x{depth}"
            )));
        }
        if cells.len() != width * depth {
            return Err(TerrainError::mismatch(
                format!("{} cells", width * depth),
                format!("{} cells", cells.len()),
            ));
        }
        Ok(HeightGrid { width, depth, cells })
    }

    /// Build a grid from a single-channel 2D float texture
    ///
    /// Texture columns become x and texture rows become z.
    pub fn from_texture(texture: &PackedTexture<f32>) -> Result<Self> {
        if texture.channels() != 1 || texture.layers() != 1 {
            return Err(TerrainError::mismatch(
                "1 channel, 1 layer",
                format!(
                    "{} channels, {} layers",
                    texture.channels(),
                    texture.layers()
                ),
            ));
        }
        Self::from_values(texture.width(), texture.height(), texture.data().to_vec())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Lowest and highest elevation in the grid
    pub fn height_range(&self) -> (f32, f32) {
        self.cells
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), h| (lo.min(*h), hi.max(*h)))
    }

    fn index(&self, x: i64, z: i64) -> Result<usize> {
        if x < 0 || z < 0 || x >= self.width as i64 || z >= self.depth as i64 {
            return Err(self.out_of_bounds(x, z));
        }
        Ok(z as usize * self.width + x as usize)
    }

    fn out_of_bounds(&self, x: i64, z: i64) -> TerrainError {
        TerrainError::OutOfBounds {
            x,
            z,
            width: self.width,
            depth: self.depth,
        }
    }

    /// Read the elevation at (x, z)
    pub fn get_height(&self, x: i64, z: i64) -> Result<f32> {
        let idx = self.index(x, z)?;
        Ok(self.cells[idx])
    }

    /// Overwrite the elevation at (x, z)
    pub fn set_height(&mut self, x: i64, z: i64, value: f32) -> Result<()> {
        let idx = self.index(x, z)?;
        self.cells[idx] = value;
        Ok(())
    }

    /// Check that the `w` x `h` rectangle at (x0, z0) lies entirely inside the grid
    fn check_patch(&self, x0: i64, z0: i64, w: usize, h: usize) -> Result<()> {
        if w == 0 || h == 0 {
            return Err(TerrainError::invalid(format!(
                "patch must be non-empty, got {w}x{h}"
            )));
        }
        // both opposite corners must be valid cells
        self.index(x0, z0)?;
        let far = |origin: i64, len: usize| {
            i64::try_from(len - 1)
                .ok()
                .and_then(|extent| origin.checked_add(extent))
                .unwrap_or(i64::MAX)
        };
        self.index(far(x0, w), far(z0, h))?;
        Ok(())
    }

    /// Read a `w` x `h` patch starting at (x0, z0) as a row-major vector
    pub fn patch(&self, x0: i64, z0: i64, w: usize, h: usize) -> Result<Vec<f32>> {
        self.check_patch(x0, z0, w, h)?;
        let mut values = Vec::with_capacity(w * h);
        for dz in 0..h {
            let start = (z0 as usize + dz) * self.width + x0 as usize;
            values.extend_from_slice(&self.cells[start..start + w]);
        }
        Ok(values)
    }

    /// Overwrite a `w` x `h` patch starting at (x0, z0)
    ///
    /// * `values` - Row-major heights, exactly `w * h` of them
    ///
    /// The whole rectangle is validated before anything is written, so a
    /// rejected patch leaves the grid untouched.
    pub fn set_height_patch(
        &mut self,
        x0: i64,
        z0: i64,
        w: usize,
        h: usize,
        values: &[f32],
    ) -> Result<()> {
        self.check_patch(x0, z0, w, h)?;
        if values.len() != w * h {
            return Err(TerrainError::invalid(format!(
                "patch of {w}x{h} needs {} values, got {}",
                w * h,
                values.len()
            )));
        }
        for (dz, row) in values.chunks_exact(w).enumerate() {
            let start = (z0 as usize + dz) * self.width + x0 as usize;
            self.cells[start..start + w].copy_from_slice(row);
        }
        Ok(())
    }
}
