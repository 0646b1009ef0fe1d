use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::heightfield::HeightGrid;

/// Maps grid cells to world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainLayout {
    /// World units between neighbouring cells
    pub width_scale: f32,
    /// World units per unit of stored height
    pub height_scale: f32,
    /// Translation applied to every vertex
    pub offset: Vec3,
}

impl Default for TerrainLayout {
    fn default() -> Self {
        TerrainLayout {
            width_scale: 2.0,
            height_scale: 1.5,
            offset: Vec3::new(0.0, -10.75, 0.0),
        }
    }
}

impl TerrainLayout {
    /// Centre of the terrain footprint at sea level
    ///
    /// Sun and water are placed relative to this point.
    pub fn origin(&self, grid: &HeightGrid) -> Vec3 {
        Vec3::new(
            grid.width() as f32 * self.width_scale / 2.0,
            0.0,
            grid.depth() as f32 * self.width_scale / 2.0,
        )
    }

    /// World position of the vertex at (x, z)
    pub fn world_position(&self, grid: &HeightGrid, x: i64, z: i64) -> Result<Vec3> {
        let h = grid.get_height(x, z)?;
        Ok(Vec3::new(
            x as f32 * self.width_scale,
            h * self.height_scale,
            z as f32 * self.width_scale,
        ) + self.offset)
    }

    /// World-space height at (x, z)
    pub fn world_height(&self, grid: &HeightGrid, x: i64, z: i64) -> Result<f32> {
        Ok(grid.get_height(x, z)? * self.height_scale + self.offset.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TerrainError;

    #[test]
    fn test_origin_is_footprint_centre() {
        let grid = HeightGrid::new(512, 256, 0.0).unwrap();
        let origin = TerrainLayout::default().origin(&grid);
        assert_eq!(origin, Vec3::new(512.0, 0.0, 256.0));
    }

    #[test]
    fn test_world_position_applies_scales_and_offset() {
        let mut grid = HeightGrid::new(8, 8, 0.0).unwrap();
        grid.set_height(3, 5, 10.0).unwrap();
        let layout = TerrainLayout::default();

        let p = layout.world_position(&grid, 3, 5).unwrap();
        assert_eq!(p, Vec3::new(6.0, 15.0 - 10.75, 10.0));
        assert_eq!(layout.world_height(&grid, 3, 5).unwrap(), 4.25);
    }

    #[test]
    fn test_world_position_is_bounds_checked() {
        let grid = HeightGrid::new(4, 4, 0.0).unwrap();
        assert!(matches!(
            TerrainLayout::default().world_position(&grid, 4, 0),
            Err(TerrainError::OutOfBounds { .. })
        ));
    }
}
