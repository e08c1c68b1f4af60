//! Recursive decomposition of a height field into a [`TerrainQuadTree`].
//!
//! Each page is cut into four overlapping quadrants of side `(size + 1) / 2`.
//! Once a quadrant would fit inside `block_size` the page gets four tiles,
//! otherwise four smaller pages that are split in turn. Every level is
//! validated before anything is allocated so a bad size fails fast instead of
//! halfway through the tree.

use std::time::Instant;

use glam::Vec2;
use log::{debug, info};

use super::config::TerrainConfig;
use super::height_field::{HeightField, is_valid_page_size};
use super::lod::{FullDetailCollapser, LodCollapser, LodSettings};
use super::quadrant::Quadrant;
use super::quadtree::{NodeId, NodeKind, QuadTreeNode, TerrainQuadTree};
use super::seams;
use super::tile::TerrainTile;
use crate::core::{Error, Result, Vec3};

/// Deepest page nesting accepted before giving up.
pub const MAX_DEPTH: u32 = 20;

/// Builds terrain trees from height fields.
pub struct QuadTreeBuilder {
    config: TerrainConfig,
    collapser: Box<dyn LodCollapser>,
}

impl QuadTreeBuilder {
    pub fn new(config: TerrainConfig) -> Self {
        Self {
            config,
            collapser: Box::new(FullDetailCollapser),
        }
    }

    /// Replace the collaborator used when `lod.enabled` is set.
    pub fn with_collapser(mut self, collapser: Box<dyn LodCollapser>) -> Self {
        self.collapser = collapser;
        self
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Split `field` into pages and tiles and fix the seams between tiles.
    pub fn build(&self, field: &HeightField) -> Result<TerrainQuadTree> {
        let start = Instant::now();
        self.config.validate()?;
        let plan = LevelPlan::new(field.size(), self.config.block_size)?;

        let mut tree = TerrainQuadTree::with_root(
            self.config.name.clone(),
            field.size(),
            self.config.step_scale(),
            plan.node_count(),
        );

        let mut pending = vec![(tree.root(), field.clone())];
        while let Some((page, heights)) = pending.pop() {
            self.split_page(&mut tree, page, &heights, &mut pending);
        }

        tree.update_bounds();
        #[cfg(debug_assertions)]
        tree.sanity_check();

        let report = seams::fix_normals(&mut tree);

        info!(
            "Built terrain '{}' ({}x{}): {} pages, {} tiles, {} seam edges in {:.2}ms",
            self.config.name,
            field.size(),
            field.size(),
            tree.page_count(),
            tree.tile_count(),
            report.edges_patched,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(tree)
    }

    fn split_page(
        &self,
        tree: &mut TerrainQuadTree,
        page: NodeId,
        heights: &HeightField,
        pending: &mut Vec<(NodeId, HeightField)>,
    ) {
        let node = tree.node(page);
        let size = node.size();
        let depth = node.depth();
        let page_offset = node.offset_cells();
        let page_name = node.name().to_string();

        let child_size = (size + 1) / 2;
        let half = (size - 1) as f32 / 2.0;
        let quarter = (size - 1) as f32 / 4.0;
        let makes_tiles = tiles_fit(size, self.config.block_size);

        debug!(
            "Splitting {} (size {}) into {}",
            page_name,
            size,
            if makes_tiles { "tiles" } else { "pages" }
        );

        for quadrant in Quadrant::ALL {
            let (sx, sz) = quadrant.signs();
            let child_offset = page_offset + Vec2::new(sx, sz) * quarter;
            let child_heights = heights.quadrant(quadrant);

            let (node, subdivide) = if makes_tiles {
                // Tiles hang from their first vertex
                let origin = Vec2::new(
                    if quadrant.is_right() { 0.0 } else { -half },
                    if quadrant.is_lower() { 0.0 } else { -half },
                );
                let tile = self.make_tile(child_heights, child_offset, tree);
                let node = QuadTreeNode::new(
                    format!("{}Block{}", page_name, quadrant.label()),
                    Some((page, quadrant)),
                    origin,
                    child_offset,
                    child_size,
                    depth + 1,
                    NodeKind::Tile(Box::new(tile)),
                );
                (node, None)
            } else {
                let node = QuadTreeNode::new(
                    format!("{}Page{}", page_name, quadrant.label()),
                    Some((page, quadrant)),
                    Vec2::new(sx, sz) * quarter,
                    child_offset,
                    child_size,
                    depth + 1,
                    NodeKind::Page {
                        children: [NodeId::EMPTY; 4],
                    },
                );
                (node, Some(child_heights))
            };

            let id = tree.attach(node);
            if let Some(child_heights) = subdivide {
                pending.push((id, child_heights));
            }
        }
    }

    fn make_tile(&self, heights: HeightField, center_cells: Vec2, tree: &TerrainQuadTree) -> TerrainTile {
        let total = tree.total_size();
        let tile_half = (heights.size() - 1) as f32 / 2.0;
        let terrain_half = (total - 1) as f32 / 2.0;
        let texture_offset = center_cells - Vec2::splat(tile_half) + Vec2::splat(terrain_half);

        TerrainTile::new(
            heights,
            tree.step_scale(),
            texture_offset,
            total,
            self.config.lod,
            self.collapser.as_ref(),
        )
    }
}

/// True when a page of `size` is split straight into tiles.
fn tiles_fit(size: u32, block_size: u32) -> bool {
    (size >> 1) + 1 <= block_size
}

/// Page sizes from the root down, checked before the build starts.
#[derive(Debug)]
struct LevelPlan {
    page_levels: u32,
}

impl LevelPlan {
    fn new(size: u32, block_size: u32) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidBlockSize(block_size));
        }

        let mut page_size = size;
        let mut page_levels = 1;
        loop {
            if !is_valid_page_size(page_size) {
                return Err(Error::InvalidSize { size: page_size });
            }
            if tiles_fit(page_size, block_size) {
                return Ok(Self { page_levels });
            }
            page_size = (page_size + 1) / 2;
            page_levels += 1;
            if page_levels > MAX_DEPTH {
                return Err(Error::DepthExceeded {
                    depth: page_levels,
                    max: MAX_DEPTH,
                });
            }
        }
    }

    /// Pages plus tiles in the finished tree.
    fn node_count(&self) -> usize {
        // 1 + 4 + 16 + ... + 4^levels
        (0..=self.page_levels).map(|level| 4usize.pow(level)).sum()
    }
}

impl TerrainQuadTree {
    /// Build a tree straight from a flat sample array.
    ///
    /// `height_map` must hold `size * size` samples in row-major order.
    /// With `use_lod` set every tile precomputes collapse records with the
    /// default collapser.
    pub fn build(
        name: &str,
        block_size: u32,
        size: u32,
        step_scale: Vec3,
        height_map: &[i32],
        use_lod: bool,
    ) -> Result<Self> {
        let field = HeightField::from_slice(size, height_map)?;
        let config = TerrainConfig::new(name, block_size, step_scale).with_lod(LodSettings {
            enabled: use_lod,
            ..Default::default()
        });
        QuadTreeBuilder::new(config).build(&field)
    }
}
