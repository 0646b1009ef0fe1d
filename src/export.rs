use glam::Vec3;
use mesh_tools::GltfBuilder;
use mesh_tools::Triangle;

use crate::error::{Result, TerrainError};
use crate::heightfield::HeightGrid;
use crate::terrain::TerrainLayout;

/// Exports the height grid as a 3D terrain mesh in GLB format
///
/// # Arguments
/// * `grid` - Heights to triangulate, one vertex per cell
/// * `layout` - Cell spacing, height scale and offset
/// * `output_path` - Path where the GLB file will be saved
pub fn export_heightgrid_to_glb(
    grid: &HeightGrid,
    layout: &TerrainLayout,
    output_path: &str,
) -> Result<()> {
    let width = grid.width();
    let depth = grid.depth();
    if width < 2 || depth < 2 {
        return Err(TerrainError::invalid(format!(
            "a mesh needs at least 2x2 cells, got {width}x{depth}"
        )));
    }

    // Create a new glTF builder
    let mut builder = GltfBuilder::new();

    // Vertex attributes, one vertex per grid cell
    let mut positions = Vec::with_capacity(width * depth);
    let mut normals = Vec::with_capacity(width * depth);
    let mut texcoords = Vec::with_capacity(width * depth);
    let mut indices = Vec::with_capacity((width - 1) * (depth - 1) * 2);

    for z in 0..depth {
        for x in 0..width {
            // Position in world space
            let p = layout.world_position(grid, x as i64, z as i64)?;
            positions.push(mesh_tools::compat::point3::new(p.x, p.y, p.z));

            // Smooth normal from the neighbouring heights
            let n = vertex_normal(grid, layout, x, z);
            normals.push(mesh_tools::compat::vector3::new(n.x, n.y, n.z));

            // UVs span the whole grid once
            texcoords.push(mesh_tools::compat::vector2::new(
                x as f32 / (width as f32 - 1.0),
                z as f32 / (depth as f32 - 1.0),
            ));
        }
    }

    // Two triangles per grid quad
    for z in 0..(depth - 1) {
        for x in 0..(width - 1) {
            let top_left = (z * width + x) as u32;
            let top_right = (z * width + x + 1) as u32;
            let bottom_left = ((z + 1) * width + x) as u32;
            let bottom_right = ((z + 1) * width + x + 1) as u32;

            // First triangle of quad
            indices.push(Triangle::new(top_left, bottom_left, top_right));
            // Second triangle of quad
            indices.push(Triangle::new(top_right, bottom_left, bottom_right));
        }
    }

    // Create the mesh
    let mesh_index = builder.create_simple_mesh(
        Some("IslandTerrain".to_string()),
        &positions,
        &indices,
        Some(normals),
        Some(texcoords),
        None,
    );
    // Create a node for the mesh and a scene containing it
    let node = builder.add_node(
        Some("Island".to_string()),
        Some(mesh_index),
        None,
        None,
        None,
    );
    builder.add_scene(Some("Island Scene".to_string()), Some(vec![node]));

    // Export to GLB
    builder
        .export_glb(output_path)
        .map_err(|e| TerrainError::Mesh(e.to_string()))?;
    log::info!("exported {width}x{depth} terrain mesh to {output_path}");
    Ok(())
}

/// Y-up surface normal from central differences, clamped at the grid edge
fn vertex_normal(grid: &HeightGrid, layout: &TerrainLayout, x: usize, z: usize) -> Vec3 {
    let height_at = |x: usize, z: usize| -> f32 {
        grid.cells()[z * grid.width() + x] * layout.height_scale
    };

    let (x0, x1) = (x.saturating_sub(1), (x + 1).min(grid.width() - 1));
    let (z0, z1) = (z.saturating_sub(1), (z + 1).min(grid.depth() - 1));

    // Slopes along x and z in world units
    let dx = (height_at(x1, z) - height_at(x0, z)) / ((x1 - x0) as f32 * layout.width_scale);
    let dz = (height_at(x, z1) - height_at(x, z0)) / ((z1 - z0) as f32 * layout.width_scale);

    Vec3::new(-dx, 1.0, -dz).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_grid_normals_point_up() {
        let grid = HeightGrid::new(4, 4, 5.0).unwrap();
        let layout = TerrainLayout::default();
        for (x, z) in [(0, 0), (1, 2), (3, 3)] {
            assert_eq!(vertex_normal(&grid, &layout, x, z), Vec3::Y);
        }
    }

    #[test]
    fn test_slope_tilts_normal_downhill() {
        // height rises along +x
        let cells = (0..16).map(|i| (i % 4) as f32).collect();
        let grid = HeightGrid::from_values(4, 4, cells).unwrap();
        let n = vertex_normal(&grid, &TerrainLayout::default(), 1, 1);
        assert!(n.x < 0.0, "Normal should lean away from the rise, got {n:?}");
        assert!(n.y > 0.0);
        assert!(n.z.abs() < 1e-6);
        assert!((n.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_export_rejects_degenerate_grid() {
        let grid = HeightGrid::new(1, 8, 0.0).unwrap();
        assert!(export_heightgrid_to_glb(&grid, &TerrainLayout::default(), "unused.glb").is_err());
    }

    #[test]
    fn test_export_writes_glb() {
        let grid = HeightGrid::new(6, 5, 1.0).unwrap();
        let path = std::env::temp_dir().join(format!("island-terrain-{}.glb", std::process::id()));
        let path_str = path.to_string_lossy().to_string();
        export_heightgrid_to_glb(&grid, &TerrainLayout::default(), &path_str).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"glTF", "GLB files start with the glTF magic");
        let _ = std::fs::remove_file(&path);
    }
}
