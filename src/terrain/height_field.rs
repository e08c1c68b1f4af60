//! Square grids of integer height samples

use super::quadrant::Quadrant;
use crate::core::{Error, Result};

/// A `size` x `size` row-major grid of unscaled integer heights.
///
/// Sample `(col, row)` lives at index `col + row * size`. Columns run along
/// +x and rows along +z.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeightField {
    size: u32,
    samples: Vec<i32>,
}

impl HeightField {
    /// Wrap a flat sample array, checking its length against `size * size`.
    pub fn new(size: u32, samples: Vec<i32>) -> Result<Self> {
        let expected = size as usize * size as usize;
        if samples.len() != expected {
            return Err(Error::HeightMapLength {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self { size, samples })
    }

    /// Copy a borrowed sample array into a new field.
    pub fn from_slice(size: u32, samples: &[i32]) -> Result<Self> {
        Self::new(size, samples.to_vec())
    }

    /// A field where every sample has the same height.
    pub fn flat(size: u32, height: i32) -> Self {
        Self {
            size,
            samples: vec![height; size as usize * size as usize],
        }
    }

    /// Samples along one side.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// All samples, row-major.
    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    /// Sample at column `col`, row `row`.
    pub fn sample(&self, col: u32, row: u32) -> i32 {
        self.samples[self.index(col, row)]
    }

    /// Flat index of `(col, row)`.
    pub fn index(&self, col: u32, row: u32) -> usize {
        debug_assert!(col < self.size && row < self.size);
        col as usize + row as usize * self.size as usize
    }

    /// Lowest and highest sample, or `None` for an empty field.
    pub fn min_max(&self) -> Option<(i32, i32)> {
        let min = *self.samples.iter().min()?;
        let max = *self.samples.iter().max()?;
        Some((min, max))
    }

    /// Copy out the `side` x `side` block whose first sample is `(col, row)`.
    ///
    /// # Panics
    ///
    /// Panics if the block does not lie entirely inside this field.
    pub(crate) fn sub_field(&self, col: u32, row: u32, side: u32) -> HeightField {
        assert!(
            col + side <= self.size && row + side <= self.size,
            "sub-field {}x{} at ({}, {}) exceeds {}x{} field",
            side, side, col, row, self.size, self.size
        );

        let mut samples = Vec::with_capacity(side as usize * side as usize);
        for r in row..row + side {
            let start = self.index(col, r);
            samples.extend_from_slice(&self.samples[start..start + side as usize]);
        }
        HeightField { size: side, samples }
    }

    /// Extract one quadrant of this field.
    ///
    /// Quadrants have side `(size + 1) / 2` and share the middle row and
    /// column with their neighbors, so adjacent children overlap by one sample.
    pub fn quadrant(&self, quadrant: Quadrant) -> HeightField {
        let split = (self.size + 1) / 2;
        let col = if quadrant.is_right() { split - 1 } else { 0 };
        let row = if quadrant.is_lower() { split - 1 } else { 0 };
        self.sub_field(col, row, split)
    }
}

/// True when `size` can be split into four equal overlapping quadrants.
pub fn is_valid_page_size(size: u32) -> bool {
    size >= 3 && (size - 1).is_power_of_two()
}
