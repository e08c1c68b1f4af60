//! Hooks for the external level-of-detail collaborator.
//!
//! A tile hands its full-detail mesh to a [`LodCollapser`] once at build
//! time and keeps the returned records. Picking which record to draw each
//! frame is left to the collaborator; tiles only carry the tunables it reads.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Per-tile LOD tunables.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodSettings {
    /// Precompute collapse records at build time
    pub enabled: bool,
    /// Target triangle density consumed by the record selector
    pub tris_per_pixel: f32,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            tris_per_pixel: 1.0,
        }
    }
}

/// One precomputed reduced-detail version of a tile mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct CollapseRecord {
    pub vertex_count: u32,
    pub triangle_count: u32,
    pub indices: Vec<u32>,
}

/// Produces collapse records for a tile mesh.
pub trait LodCollapser: Send + Sync {
    /// Called once per tile. The first record should be the full-detail mesh.
    fn precompute(&self, positions: &[Vec3], indices: &[u32]) -> Vec<CollapseRecord>;
}

/// Collapser that returns only the full-detail record.
#[derive(Clone, Copy, Debug, Default)]
pub struct FullDetailCollapser;

impl LodCollapser for FullDetailCollapser {
    fn precompute(&self, positions: &[Vec3], indices: &[u32]) -> Vec<CollapseRecord> {
        vec![CollapseRecord {
            vertex_count: positions.len() as u32,
            triangle_count: (indices.len() / 3) as u32,
            indices: indices.to_vec(),
        }]
    }
}
