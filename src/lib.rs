//! Terrapage - quadtree level-of-detail decomposition for height-field terrain
//!
//! A square grid of height samples is split into a quadtree of pages whose
//! leaves are renderable tiles. Tiles carry positions, texture coordinates,
//! normals and triangle indices; the finished tree answers height queries
//! anywhere on the terrain.

pub mod core;
pub mod math;
pub mod terrain;
