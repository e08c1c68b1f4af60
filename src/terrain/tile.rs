//! Terrain tiles: the leaf geometry of the quadtree.
//!
//! A tile owns a square slice of the height field and derives everything a
//! renderer needs from it: one vertex per sample, two triangles per cell,
//! globally normalized texture coordinates and per-vertex normals. Normals
//! computed here only look inside the tile; the seam pass in
//! [`super::seams`] patches the shared edges once the whole tree exists.

use glam::{Vec2, Vec3};

use super::height_field::HeightField;
use super::lod::{CollapseRecord, LodCollapser, LodSettings};
use crate::math::Aabb;

/// Opaque id of a GPU-side buffer created by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Leaf node holding renderable mesh data for one terrain patch.
#[derive(Clone, Debug)]
pub struct TerrainTile {
    heights: HeightField,
    step_scale: Vec3,
    /// Min corner of the tile relative to the terrain's min corner, in grid cells
    texture_offset: Vec2,
    total_size: u32,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    indices: Vec<u32>,
    bounds: Aabb,
    lod: LodSettings,
    collapse_records: Vec<CollapseRecord>,
    normal_buffer: Option<BufferHandle>,
}

impl TerrainTile {
    /// Build a tile and all of its mesh buffers.
    ///
    /// `texture_offset` is in grid cells and `total_size` is the sample count
    /// along one side of the whole terrain. When `lod.enabled` is set the
    /// collapser runs once on the finished mesh.
    pub fn new(
        heights: HeightField,
        step_scale: Vec3,
        texture_offset: Vec2,
        total_size: u32,
        lod: LodSettings,
        collapser: &dyn LodCollapser,
    ) -> Self {
        let size = heights.size();
        debug_assert!(size >= 2, "tiles need at least one cell");

        let positions = build_positions(&heights, step_scale);
        let indices = build_indices(size);
        let tex_coords = build_tex_coords(size, texture_offset, total_size);
        let normals = build_normals(size, &positions);
        let bounds = Aabb::from_points(&positions).unwrap_or_default();

        let collapse_records = if lod.enabled {
            collapser.precompute(&positions, &indices)
        } else {
            Vec::new()
        };

        Self {
            heights,
            step_scale,
            texture_offset,
            total_size,
            positions,
            normals,
            tex_coords,
            indices,
            bounds,
            lod,
            collapse_records,
            normal_buffer: None,
        }
    }

    /// Samples along one side of this tile.
    pub fn size(&self) -> u32 {
        self.heights.size()
    }

    /// Samples along one side of the whole terrain.
    pub fn total_size(&self) -> u32 {
        self.total_size
    }

    pub fn step_scale(&self) -> Vec3 {
        self.step_scale
    }

    /// The tile's own slice of the height field.
    pub fn heights(&self) -> &HeightField {
        &self.heights
    }

    /// World-space texture offset of the tile's first vertex.
    pub fn texture_offset(&self) -> Vec2 {
        self.texture_offset * Vec2::new(self.step_scale.x, self.step_scale.z)
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn tex_coords(&self) -> &[Vec2] {
        &self.tex_coords
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Local-space bounds of the tile's vertices.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Texture coordinates for a detail layer repeated `repeat` times across
    /// the whole terrain.
    pub fn detail_tex_coords(&self, repeat: f32) -> Vec<Vec2> {
        self.tex_coords.iter().map(|uv| *uv * repeat).collect()
    }

    pub fn lod_settings(&self) -> LodSettings {
        self.lod
    }

    /// Adjust the density target read by the record selector.
    pub fn set_tris_per_pixel(&mut self, tris_per_pixel: f32) {
        self.lod.tris_per_pixel = tris_per_pixel;
    }

    /// Records precomputed at build time; empty when LOD is disabled.
    pub fn collapse_records(&self) -> &[CollapseRecord] {
        &self.collapse_records
    }

    /// Cached GPU normal buffer, if one has been uploaded and is still valid.
    pub fn normal_buffer(&self) -> Option<BufferHandle> {
        self.normal_buffer
    }

    pub fn set_normal_buffer(&mut self, handle: BufferHandle) {
        self.normal_buffer = Some(handle);
    }

    /// Drop the cached normal buffer so the renderer re-uploads it.
    pub fn invalidate_normal_buffer(&mut self) {
        self.normal_buffer = None;
    }

    /// Vertex positions as raw bytes for upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Normals as raw bytes for upload.
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    /// Texture coordinates as raw bytes for upload.
    pub fn tex_coord_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.tex_coords)
    }

    /// Triangle indices as raw bytes for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Overwrite individual normals. Positions are never touched.
    pub(crate) fn patch_normals(&mut self, patches: &[(usize, Vec3)]) {
        for &(index, normal) in patches {
            self.normals[index] = normal;
        }
        self.normal_buffer = None;
    }

    /// Height at a point in the tile's local world space.
    ///
    /// Returns `NaN` outside the tile.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        self.height_at_cells(x / self.step_scale.x, z / self.step_scale.z)
    }

    /// Height at a point given in grid cells from the tile's first vertex.
    ///
    /// Inside the tile the scaled height is interpolated along x and along z
    /// from the cell's first sample and the two partial results are averaged.
    /// On the last row or column there is nothing to interpolate toward and
    /// the scaled sample itself is returned.
    pub fn height_at_cells(&self, x: f32, z: f32) -> f32 {
        let size = self.size();
        let last = (size - 1) as f32;
        if !(x >= 0.0 && z >= 0.0 && x <= last && z <= last) {
            return f32::NAN;
        }

        let col = x.floor() as u32;
        let row = z.floor() as u32;
        let base = self.scaled_sample(col, row);
        if col + 1 >= size || row + 1 >= size {
            return base;
        }

        let along_x = lerp(base, self.scaled_sample(col + 1, row), x - col as f32);
        let along_z = lerp(base, self.scaled_sample(col, row + 1), z - row as f32);
        (along_x + along_z) * 0.5
    }

    fn scaled_sample(&self, col: u32, row: u32) -> f32 {
        self.heights.sample(col, row) as f32 * self.step_scale.y
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn build_positions(heights: &HeightField, step_scale: Vec3) -> Vec<Vec3> {
    let size = heights.size();
    let mut positions = Vec::with_capacity(size as usize * size as usize);
    for row in 0..size {
        for col in 0..size {
            positions.push(Vec3::new(
                col as f32 * step_scale.x,
                heights.sample(col, row) as f32 * step_scale.y,
                row as f32 * step_scale.z,
            ));
        }
    }
    positions
}

/// Two triangles per cell, both wound so their face normal points up.
fn build_indices(size: u32) -> Vec<u32> {
    let cells = (size - 1) as usize;
    let mut indices = Vec::with_capacity(cells * cells * 6);
    for row in 0..size - 1 {
        for col in 0..size - 1 {
            let i = col + row * size;
            indices.extend_from_slice(&[i, i + size, i + 1]);
            indices.extend_from_slice(&[i + 1, i + size, i + size + 1]);
        }
    }
    indices
}

/// `(col + offset) / (total_size - 1)` on both axes, so any two vertices at
/// the same terrain position get bit-identical coordinates.
fn build_tex_coords(size: u32, offset: Vec2, total_size: u32) -> Vec<Vec2> {
    let extent = (total_size - 1) as f32;
    let mut tex_coords = Vec::with_capacity(size as usize * size as usize);
    for row in 0..size {
        for col in 0..size {
            tex_coords.push(Vec2::new(
                (col as f32 + offset.x) / extent,
                (row as f32 + offset.y) / extent,
            ));
        }
    }
    tex_coords
}

/// Local-only normals from forward differences, falling back to backward
/// differences on the last row and column.
fn build_normals(size: u32, positions: &[Vec3]) -> Vec<Vec3> {
    let size = size as usize;
    let mut normals = Vec::with_capacity(size * size);
    for row in 0..size {
        for col in 0..size {
            let i = col + row * size;
            let p = positions[i];
            let along_x = if col + 1 < size {
                positions[i + 1] - p
            } else {
                p - positions[i - 1]
            };
            let along_z = if row + 1 < size {
                positions[i + size] - p
            } else {
                p - positions[i - size]
            };
            normals.push(along_z.cross(along_x).normalize());
        }
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::lod::FullDetailCollapser;

    fn tile_from(size: u32, samples: Vec<i32>, step: Vec3) -> TerrainTile {
        TerrainTile::new(
            HeightField::new(size, samples).unwrap(),
            step,
            Vec2::ZERO,
            size,
            LodSettings::default(),
            &FullDetailCollapser,
        )
    }

    fn flat_tile(size: u32) -> TerrainTile {
        tile_from(size, vec![0; (size * size) as usize], Vec3::ONE)
    }

    #[test]
    fn test_buffer_sizes() {
        for size in [2u32, 3, 5, 9, 17] {
            let tile = flat_tile(size);
            let n = size as usize;
            assert_eq!(tile.vertex_count(), n * n);
            assert_eq!(tile.normals().len(), n * n);
            assert_eq!(tile.tex_coords().len(), n * n);
            assert_eq!(tile.indices().len(), (n - 1) * (n - 1) * 6);
            assert_eq!(tile.triangle_count(), (n - 1) * (n - 1) * 2);
        }
    }

    #[test]
    fn test_positions_are_scaled() {
        let samples = (0..9).collect();
        let tile = tile_from(3, samples, Vec3::new(2.0, 0.5, 4.0));
        assert_eq!(tile.positions()[0], Vec3::new(0.0, 0.0, 0.0));
        // col 1, row 2 -> sample 7
        assert_eq!(tile.positions()[7], Vec3::new(2.0, 3.5, 8.0));
        assert_eq!(tile.positions()[8], Vec3::new(4.0, 4.0, 8.0));
    }

    #[test]
    fn test_indices_in_range_and_wound_up() {
        let tile = flat_tile(5);
        let positions = tile.positions();
        for tri in tile.indices().chunks(3) {
            for &i in tri {
                assert!((i as usize) < positions.len());
            }
            let a = positions[tri[0] as usize];
            let b = positions[tri[1] as usize];
            let c = positions[tri[2] as usize];
            let face = (b - a).cross(c - a);
            assert!(face.y > 0.0, "triangle {:?} faces down", tri);
        }
    }

    #[test]
    fn test_first_cell_triangles() {
        let tile = flat_tile(3);
        assert_eq!(&tile.indices()[..6], &[0, 3, 1, 1, 3, 4]);
        // Last cell is (1, 1)
        assert_eq!(&tile.indices()[18..], &[4, 7, 5, 5, 7, 8]);
    }

    #[test]
    fn test_tex_coords_normalized() {
        let tile = TerrainTile::new(
            HeightField::flat(3, 0),
            Vec3::new(3.0, 1.0, 3.0),
            Vec2::new(2.0, 0.0),
            5,
            LodSettings::default(),
            &FullDetailCollapser,
        );
        assert_eq!(tile.tex_coords()[0], Vec2::new(0.5, 0.0));
        assert_eq!(tile.tex_coords()[2], Vec2::new(1.0, 0.0));
        assert_eq!(tile.tex_coords()[8], Vec2::new(1.0, 0.5));
        assert_eq!(tile.texture_offset(), Vec2::new(6.0, 0.0));
    }

    #[test]
    fn test_detail_tex_coords() {
        let tile = flat_tile(3);
        let detail = tile.detail_tex_coords(8.0);
        assert_eq!(detail.len(), 9);
        assert_eq!(detail[8], Vec2::new(8.0, 8.0));
        assert_eq!(detail[4], Vec2::new(4.0, 4.0));
    }

    #[test]
    fn test_flat_normals_point_up() {
        let tile = flat_tile(5);
        for n in tile.normals() {
            assert_eq!(*n, Vec3::Y);
        }
    }

    #[test]
    fn test_slope_normals() {
        // Height rises by one per column
        let samples = (0..9).map(|i| i % 3).collect();
        let tile = tile_from(3, samples, Vec3::ONE);
        let expected = Vec3::new(-1.0, 1.0, 0.0).normalize();
        for n in tile.normals() {
            assert!((*n - expected).length() < 1e-6, "{:?}", n);
        }
    }

    #[test]
    fn test_last_column_uses_backward_difference() {
        // Only the last column is raised: the interior sees a rise into it,
        // and the last column sees the same rise looking back.
        let samples = vec![0, 0, 2, 0, 0, 2, 0, 0, 2];
        let tile = tile_from(3, samples, Vec3::ONE);
        let rising = Vec3::new(-2.0, 1.0, 0.0).normalize();
        assert!((tile.normals()[1] - rising).length() < 1e-6);
        assert!((tile.normals()[2] - rising).length() < 1e-6);
        assert_eq!(tile.normals()[0], Vec3::Y);
    }

    #[test]
    fn test_height_at_grid_vertices() {
        let samples: Vec<i32> = vec![1, 5, -3, 7, 2, 9, 4, 0, 6];
        let tile = tile_from(3, samples.clone(), Vec3::new(2.0, 0.5, 2.0));
        for row in 0..3u32 {
            for col in 0..3u32 {
                let expected = samples[(col + row * 3) as usize] as f32 * 0.5;
                let h = tile.height_at(col as f32 * 2.0, row as f32 * 2.0);
                assert_eq!(h, expected, "vertex ({}, {})", col, row);
            }
        }
    }

    #[test]
    fn test_height_at_interpolates_and_averages() {
        // Row 0: 0 2 4, everything else 0
        let samples = vec![0, 2, 4, 0, 0, 0, 0, 0, 0];
        let tile = tile_from(3, samples, Vec3::ONE);
        // Along x the partial is 1, along z it is 0
        assert_eq!(tile.height_at(0.5, 0.0), 0.5);
        // Base sample 2: x partial lerps toward 4, z partial toward 0
        assert_eq!(tile.height_at(1.5, 0.5), 2.0);
    }

    #[test]
    fn test_height_at_within_cell_bounds() {
        let samples = vec![3, 9, 1, -4, 6, 2, 8, 0, 5];
        let tile = tile_from(3, samples.clone(), Vec3::ONE);
        let points: [(f32, f32); 4] = [(0.25, 0.75), (1.5, 0.5), (0.9, 1.1), (1.99, 1.99)];
        for (x, z) in points {
            let col = x.floor() as usize;
            let row = z.floor() as usize;
            let corners = [
                samples[col + row * 3],
                samples[col + 1 + row * 3],
                samples[col + (row + 1) * 3],
                samples[col + 1 + (row + 1) * 3],
            ];
            let min = *corners.iter().min().unwrap() as f32;
            let max = *corners.iter().max().unwrap() as f32;
            let h = tile.height_at(x, z);
            assert!(h >= min && h <= max, "{} not in [{}, {}] at ({}, {})", h, min, max, x, z);
        }
    }

    #[test]
    fn test_height_at_last_row_and_column_returns_sample() {
        let samples = vec![0, 0, 4, 0, 0, 8, 6, 2, 10];
        let tile = tile_from(3, samples, Vec3::ONE);
        assert_eq!(tile.height_at(2.0, 0.5), 4.0);
        assert_eq!(tile.height_at(0.5, 2.0), 6.0);
        assert_eq!(tile.height_at(2.0, 2.0), 10.0);
    }

    #[test]
    fn test_height_at_out_of_range_is_nan() {
        let tile = flat_tile(3);
        assert!(tile.height_at(-0.01, 1.0).is_nan());
        assert!(tile.height_at(1.0, -0.01).is_nan());
        assert!(tile.height_at(2.01, 1.0).is_nan());
        assert!(tile.height_at(1.0, 2.5).is_nan());
        assert!(tile.height_at(f32::NAN, 1.0).is_nan());
        assert_eq!(tile.height_at(2.0, 2.0), 0.0);
    }

    #[test]
    fn test_bounds_contain_positions() {
        let samples = vec![3, 9, 1, -4, 6, 2, 8, 0, 5];
        let tile = tile_from(3, samples, Vec3::new(1.0, 2.0, 1.0));
        let bounds = tile.bounds();
        assert_eq!(bounds.min, Vec3::new(0.0, -8.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(2.0, 18.0, 2.0));
        for p in tile.positions() {
            assert!(bounds.contains_point(*p));
        }
    }

    #[test]
    fn test_lod_records_only_when_enabled() {
        let tile = flat_tile(3);
        assert!(tile.collapse_records().is_empty());

        let lod = LodSettings { enabled: true, tris_per_pixel: 0.5 };
        let mut tile = TerrainTile::new(
            HeightField::flat(3, 0),
            Vec3::ONE,
            Vec2::ZERO,
            3,
            lod,
            &FullDetailCollapser,
        );
        assert_eq!(tile.collapse_records().len(), 1);
        assert_eq!(tile.collapse_records()[0].triangle_count, 8);
        assert_eq!(tile.lod_settings().tris_per_pixel, 0.5);

        tile.set_tris_per_pixel(2.0);
        assert_eq!(tile.lod_settings().tris_per_pixel, 2.0);
    }

    #[test]
    fn test_normal_buffer_invalidation() {
        let mut tile = flat_tile(3);
        assert_eq!(tile.normal_buffer(), None);
        tile.set_normal_buffer(BufferHandle(7));
        assert_eq!(tile.normal_buffer(), Some(BufferHandle(7)));

        tile.patch_normals(&[(0, Vec3::X)]);
        assert_eq!(tile.normals()[0], Vec3::X);
        assert_eq!(tile.normal_buffer(), None);
        // Positions untouched
        assert_eq!(tile.positions()[0], Vec3::ZERO);
    }

    #[test]
    fn test_byte_views() {
        let tile = flat_tile(3);
        assert_eq!(tile.position_bytes().len(), 9 * 12);
        assert_eq!(tile.normal_bytes().len(), 9 * 12);
        assert_eq!(tile.tex_coord_bytes().len(), 9 * 8);
        assert_eq!(tile.index_bytes().len(), 24 * 4);
    }
}
