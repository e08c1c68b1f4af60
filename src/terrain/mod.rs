//! Quadtree decomposition of height-field terrain

pub mod builder;
pub mod config;
pub mod height_field;
pub mod lod;
pub mod quadrant;
pub mod quadtree;
pub mod seams;
pub mod tile;

pub use builder::{MAX_DEPTH, QuadTreeBuilder};
pub use config::TerrainConfig;
pub use height_field::{HeightField, is_valid_page_size};
pub use lod::{CollapseRecord, FullDetailCollapser, LodCollapser, LodSettings};
pub use quadrant::Quadrant;
pub use quadtree::{NodeId, NodeKind, QuadTreeNode, TerrainQuadTree};
pub use seams::{SeamReport, fix_normals};
pub use tile::{BufferHandle, TerrainTile};
