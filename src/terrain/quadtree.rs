//! Arena-backed quadtree of terrain pages and tiles.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. Every
//! node records its parent and which [`Quadrant`] of that parent it fills,
//! which is all the neighbor walks need. The tree is immutable once built;
//! only the renderer-facing tile state (buffer handles, LOD density) can be
//! touched afterwards.

use glam::{Vec2, Vec3};

use super::quadrant::Quadrant;
use super::tile::TerrainTile;
use crate::math::Aabb;

/// Index of a node in the tree's arena.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const EMPTY: NodeId = NodeId(u32::MAX);

    pub(crate) fn new(index: usize) -> Self {
        assert!(index < u32::MAX as usize);
        Self(index as u32)
    }

    pub(crate) fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Position in the arena.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// What a node holds.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Internal node with exactly four children, in [`Quadrant::ALL`] order.
    Page { children: [NodeId; 4] },
    /// Leaf with mesh data.
    Tile(Box<TerrainTile>),
}

/// A page or tile plus its placement bookkeeping.
#[derive(Clone, Debug)]
pub struct QuadTreeNode {
    name: String,
    parent: Option<NodeId>,
    quadrant: Option<Quadrant>,
    /// Pages: center relative to the parent's center. Tiles: first vertex
    /// relative to the parent's center. Grid cells.
    origin: Vec2,
    /// Center relative to the terrain center, accumulated down the tree. Grid cells.
    offset: Vec2,
    size: u32,
    depth: u32,
    bounds: Aabb,
    kind: NodeKind,
}

impl QuadTreeNode {
    pub(crate) fn new(
        name: String,
        parent: Option<(NodeId, Quadrant)>,
        origin: Vec2,
        offset: Vec2,
        size: u32,
        depth: u32,
        kind: NodeKind,
    ) -> Self {
        let bounds = match &kind {
            NodeKind::Tile(tile) => tile.bounds(),
            NodeKind::Page { .. } => Aabb::default(),
        };
        Self {
            name,
            parent: parent.map(|(id, _)| id),
            quadrant: parent.map(|(_, q)| q),
            origin,
            offset,
            size,
            depth,
            bounds,
            kind,
        }
    }

    /// Display name such as `terrainPage2Block3`. Never used for lookups.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Which quadrant of the parent this node fills; `None` for the root.
    pub fn quadrant(&self) -> Option<Quadrant> {
        self.quadrant
    }

    /// Origin relative to the parent, in grid cells.
    pub fn origin_cells(&self) -> Vec2 {
        self.origin
    }

    /// Center relative to the terrain center, in grid cells.
    pub fn offset_cells(&self) -> Vec2 {
        self.offset
    }

    /// Samples along one side.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Zero at the root.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Bounds in this node's local space.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_tile(&self) -> bool {
        matches!(self.kind, NodeKind::Tile(_))
    }

    pub fn tile(&self) -> Option<&TerrainTile> {
        match &self.kind {
            NodeKind::Tile(tile) => Some(tile),
            NodeKind::Page { .. } => None,
        }
    }

    pub fn children(&self) -> Option<[NodeId; 4]> {
        match &self.kind {
            NodeKind::Page { children } => Some(*children),
            NodeKind::Tile(_) => None,
        }
    }
}

/// The finished terrain: a root page and everything below it.
#[derive(Clone, Debug)]
pub struct TerrainQuadTree {
    nodes: Vec<QuadTreeNode>,
    root: NodeId,
    total_size: u32,
    step_scale: Vec3,
}

impl TerrainQuadTree {
    /// Start a tree holding only an empty root page.
    pub(crate) fn with_root(name: String, total_size: u32, step_scale: Vec3, capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(QuadTreeNode::new(
            name,
            None,
            Vec2::ZERO,
            Vec2::ZERO,
            total_size,
            0,
            NodeKind::Page { children: [NodeId::EMPTY; 4] },
        ));
        Self {
            nodes,
            root: NodeId::new(0),
            total_size,
            step_scale,
        }
    }

    /// Append `node` as the `quadrant` child of its parent page.
    pub(crate) fn attach(&mut self, node: QuadTreeNode) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        let (parent, quadrant) = match (node.parent, node.quadrant) {
            (Some(parent), Some(quadrant)) => (parent, quadrant),
            _ => panic!("node {} attached without a parent", node.name),
        };
        match &mut self.nodes[parent.index()].kind {
            NodeKind::Page { children } => {
                assert!(children[quadrant.index()].is_empty(), "quadrant {:?} filled twice", quadrant);
                children[quadrant.index()] = id;
            }
            NodeKind::Tile(_) => panic!("cannot attach children to a tile"),
        }
        self.nodes.push(node);
        id
    }

    /// Recompute page bounds from their children, deepest first.
    pub(crate) fn update_bounds(&mut self) {
        // Children are always allocated after their parent.
        for index in (0..self.nodes.len()).rev() {
            let Some(children) = self.nodes[index].children() else {
                continue;
            };
            let bounds = children
                .iter()
                .map(|child| {
                    let node = self.node(*child);
                    node.bounds.translated(self.translation(*child))
                })
                .reduce(|a, b| a.merged(&b))
                .unwrap_or_default();
            self.nodes[index].bounds = bounds;
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Name given to the root page.
    pub fn name(&self) -> &str {
        &self.nodes[self.root.index()].name
    }

    /// Samples along one side of the whole terrain.
    pub fn total_size(&self) -> u32 {
        self.total_size
    }

    pub fn step_scale(&self) -> Vec3 {
        self.step_scale
    }

    pub fn node(&self, id: NodeId) -> &QuadTreeNode {
        &self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn page_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_tile()).count()
    }

    pub fn tile_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_tile()).count()
    }

    /// Deepest level in the tree; tiles all sit at this depth.
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Bounds of the whole terrain in root space.
    pub fn bounds(&self) -> Aabb {
        self.node(self.root).bounds
    }

    pub fn children(&self, id: NodeId) -> Option<[NodeId; 4]> {
        self.node(id).children()
    }

    /// The `quadrant` child of a page.
    ///
    /// Panics when `id` is a tile; neighbor walks only descend through pages
    /// and a tile here means the tree is malformed.
    pub fn child(&self, id: NodeId, quadrant: Quadrant) -> NodeId {
        match self.node(id).children() {
            Some(children) => children[quadrant.index()],
            None => panic!("{} is a tile and has no {:?} child", self.node(id).name, quadrant),
        }
    }

    pub fn get_tile(&self, id: NodeId) -> Option<&TerrainTile> {
        self.node(id).tile()
    }

    /// Mutable access for renderer-side state such as buffer handles.
    pub fn get_tile_mut(&mut self, id: NodeId) -> Option<&mut TerrainTile> {
        match &mut self.nodes[id.index()].kind {
            NodeKind::Tile(tile) => Some(tile),
            NodeKind::Page { .. } => None,
        }
    }

    pub(crate) fn expect_tile(&self, id: NodeId) -> &TerrainTile {
        match self.get_tile(id) {
            Some(tile) => tile,
            None => panic!("{} is a page, expected a tile", self.node(id).name),
        }
    }

    pub(crate) fn expect_tile_mut(&mut self, id: NodeId) -> &mut TerrainTile {
        assert!(self.node(id).is_tile(), "{} is a page, expected a tile", self.node(id).name);
        match &mut self.nodes[id.index()].kind {
            NodeKind::Tile(tile) => tile,
            NodeKind::Page { .. } => unreachable!(),
        }
    }

    /// All tiles in arena order.
    pub fn tiles(&self) -> impl Iterator<Item = (NodeId, &TerrainTile)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.tile().map(|t| (NodeId::new(i), t)))
    }

    /// Tile ids in depth-first, quadrant order.
    pub fn tiles_depth_first(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.tile_count());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match self.node(id).children() {
                // Reversed so the first quadrant is visited first
                Some(children) => stack.extend(children.iter().rev()),
                None => out.push(id),
            }
        }
        out
    }

    /// Translation of a node relative to its parent, in world units.
    pub fn translation(&self, id: NodeId) -> Vec3 {
        let origin = self.node(id).origin;
        Vec3::new(origin.x * self.step_scale.x, 0.0, origin.y * self.step_scale.z)
    }

    /// Translation of a node relative to the root page center.
    pub fn world_translation(&self, id: NodeId) -> Vec3 {
        let mut total = Vec3::ZERO;
        let mut current = Some(id);
        while let Some(node) = current {
            total += self.translation(node);
            current = self.node(node).parent;
        }
        total
    }

    /// Node sharing this node's right (+x) edge, at the same depth.
    ///
    /// Left children find their sibling directly. Right children ask their
    /// parent for its right neighbor and take the mirrored child from it,
    /// so the walk climbs until some ancestor has a right sibling and then
    /// comes back down. `None` on the terrain's right border.
    pub fn right_neighbor(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        let (parent, quadrant) = (node.parent?, node.quadrant?);
        let mirrored = quadrant.mirrored_horizontal();
        if !quadrant.is_right() {
            return Some(self.child(parent, mirrored));
        }
        let parent_neighbor = self.right_neighbor(parent)?;
        Some(self.child(parent_neighbor, mirrored))
    }

    /// Node sharing this node's bottom (+z) edge, at the same depth.
    ///
    /// Mirror image of [`Self::right_neighbor`] along the other axis.
    pub fn below_neighbor(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        let (parent, quadrant) = (node.parent?, node.quadrant?);
        let mirrored = quadrant.mirrored_vertical();
        if !quadrant.is_lower() {
            return Some(self.child(parent, mirrored));
        }
        let parent_neighbor = self.below_neighbor(parent)?;
        Some(self.child(parent_neighbor, mirrored))
    }

    /// Height at `(x, z)` in world units relative to the root page center.
    ///
    /// The root covers `±(total_size - 1) / 2` steps on each axis. Points
    /// outside, or non-finite input, give `NaN`.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let mut local = Vec2::new(x / self.step_scale.x, z / self.step_scale.z);
        let mut id = self.root;
        loop {
            let node = self.node(id);
            match &node.kind {
                NodeKind::Tile(tile) => return tile.height_at_cells(local.x, local.y),
                NodeKind::Page { children } => {
                    let quadrant = Quadrant::containing(local.x, local.y);
                    id = children[quadrant.index()];
                    local -= self.node(id).origin;
                }
            }
        }
    }

    /// [`Self::height_at`] taking x and z from a 2D point.
    pub fn height_at_vec2(&self, position: Vec2) -> f32 {
        self.height_at(position.x, position.y)
    }

    /// [`Self::height_at`] ignoring the point's y.
    pub fn height_at_point(&self, position: Vec3) -> f32 {
        self.height_at(position.x, position.z)
    }

    #[cfg(debug_assertions)]
    pub(crate) fn sanity_check(&self) {
        for (index, node) in self.nodes.iter().enumerate() {
            let Some(children) = node.children() else {
                continue;
            };
            for quadrant in Quadrant::ALL {
                let child_id = children[quadrant.index()];
                assert!(!child_id.is_empty(), "{} is missing {:?}", node.name, quadrant);
                let child = self.node(child_id);
                assert_eq!(child.parent, Some(NodeId::new(index)));
                assert_eq!(child.quadrant, Some(quadrant));
                assert_eq!(child.depth, node.depth + 1);
                assert_eq!(child.size, (node.size + 1) / 2);
            }
        }
    }
}
