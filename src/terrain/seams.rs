//! Seam normal fixup between neighboring tiles.
//!
//! Tiles compute normals from their own samples only, so vertices on a
//! shared edge get two different normals and lighting shows a crease. This
//! pass makes each tile's right column and bottom row use the normals of the
//! tile on the other side, whose first column / first row were computed with
//! a forward difference that sees past the seam. The bottom-right corner
//! takes the diagonal neighbor's first normal.
//!
//! Patches only ever read a neighbor's first row or column and only ever
//! write a tile's last row or column, so the result does not depend on visit
//! order and running the pass twice changes nothing.

use glam::Vec3;
use log::trace;

use super::quadtree::{NodeId, TerrainQuadTree};

/// What a seam pass changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeamReport {
    /// Tiles that received at least one patched normal
    pub tiles_patched: usize,
    /// Right and bottom edges copied from a neighbor
    pub edges_patched: usize,
}

/// Copy edge normals from right, lower and diagonal neighbors into each tile.
///
/// Positions are untouched. Every tile that is written or read as a source
/// has its normal buffer handle cleared so the renderer re-uploads it.
pub fn fix_normals(tree: &mut TerrainQuadTree) -> SeamReport {
    let mut report = SeamReport::default();

    for id in tree.tiles_depth_first() {
        let right = tree.right_neighbor(id);
        let below = tree.below_neighbor(id);
        let diagonal = right.and_then(|r| tree.below_neighbor(r));

        let patches = collect_patches(tree, id, right, below, diagonal, &mut report);
        if patches.is_empty() {
            continue;
        }

        trace!("Patched {} seam normals on {}", patches.len(), tree.node(id).name());
        tree.expect_tile_mut(id).patch_normals(&patches);
        for neighbor in [right, below, diagonal].into_iter().flatten() {
            tree.expect_tile_mut(neighbor).invalidate_normal_buffer();
        }
        report.tiles_patched += 1;
    }

    report
}

fn collect_patches(
    tree: &TerrainQuadTree,
    id: NodeId,
    right: Option<NodeId>,
    below: Option<NodeId>,
    diagonal: Option<NodeId>,
    report: &mut SeamReport,
) -> Vec<(usize, Vec3)> {
    let size = tree.expect_tile(id).size() as usize;
    let mut patches = Vec::new();

    if let Some(right) = right {
        let source = tree.expect_tile(right);
        assert_eq!(source.size() as usize, size, "{} and its right neighbor differ in size", tree.node(id).name());
        patches.extend((0..size).map(|row| (row * size + size - 1, source.normals()[row * size])));
        report.edges_patched += 1;
    }

    if let Some(below) = below {
        let source = tree.expect_tile(below);
        assert_eq!(source.size() as usize, size, "{} and its lower neighbor differ in size", tree.node(id).name());
        patches.extend((0..size).map(|col| ((size - 1) * size + col, source.normals()[col])));
        report.edges_patched += 1;
    }

    // Applied last so it wins over both edge patches
    if let Some(diagonal) = diagonal {
        patches.push((size * size - 1, tree.expect_tile(diagonal).normals()[0]));
    }

    patches
}
