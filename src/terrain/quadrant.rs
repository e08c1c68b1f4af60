//! Quadrant labels for quadtree children.
//!
//! "Upper" is the low-row (-z) half of a page and "lower" the high-row (+z)
//! half; "left" is the low-column (-x) half and "right" the high-column (+x)
//! half. Child order follows the historical block numbering 1..4.

/// Position of a child relative to its parent page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quadrant {
    UpperLeft,
    LowerLeft,
    UpperRight,
    LowerRight,
}

impl Quadrant {
    /// All quadrants in child-array order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::UpperLeft,
        Quadrant::LowerLeft,
        Quadrant::UpperRight,
        Quadrant::LowerRight,
    ];

    /// Build a quadrant from which halves of the page it covers.
    pub fn from_sides(right: bool, lower: bool) -> Self {
        match (right, lower) {
            (false, false) => Quadrant::UpperLeft,
            (false, true) => Quadrant::LowerLeft,
            (true, false) => Quadrant::UpperRight,
            (true, true) => Quadrant::LowerRight,
        }
    }

    /// Quadrant containing a point given relative to the page center.
    ///
    /// Points on the center lines belong to the right/lower half.
    pub fn containing(x: f32, z: f32) -> Self {
        Self::from_sides(x >= 0.0, z >= 0.0)
    }

    /// Index into a page's child array.
    pub fn index(self) -> usize {
        match self {
            Quadrant::UpperLeft => 0,
            Quadrant::LowerLeft => 1,
            Quadrant::UpperRight => 2,
            Quadrant::LowerRight => 3,
        }
    }

    /// 1-based label used in node names.
    pub fn label(self) -> usize {
        self.index() + 1
    }

    /// True for the +x (high column) half.
    pub fn is_right(self) -> bool {
        matches!(self, Quadrant::UpperRight | Quadrant::LowerRight)
    }

    /// True for the +z (high row) half.
    pub fn is_lower(self) -> bool {
        matches!(self, Quadrant::LowerLeft | Quadrant::LowerRight)
    }

    /// Same row, other column.
    pub fn mirrored_horizontal(self) -> Self {
        Self::from_sides(!self.is_right(), self.is_lower())
    }

    /// Same column, other row.
    pub fn mirrored_vertical(self) -> Self {
        Self::from_sides(self.is_right(), !self.is_lower())
    }

    /// -1.0 or 1.0 along x and z.
    pub fn signs(self) -> (f32, f32) {
        (
            if self.is_right() { 1.0 } else { -1.0 },
            if self.is_lower() { 1.0 } else { -1.0 },
        )
    }
}
