use core::ops::Range;




/**
 * Represents a rectangular region in a discrete, N-dimensional index space.
 * The index type is signed 64-bit integer, so that regions may be placed
 * anywhere relative to a reference lattice. Every range has a non-negative
 * length: spaces are only built from `usize` extents and bounding unions.
 */
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexSpace {
    ranges: Vec<Range<i64>>,
}




// ============================================================================
impl IndexSpace {


    /**
     * Return an index space starting at zero with the given extent on each
     * axis.
     */
    pub fn from_shape(shape: &[usize]) -> Self {
        Self { ranges: shape.iter().map(|&n| 0..n as i64).collect() }
    }


    /**
     * Return an index space with the given start index and extent.
     */
    pub fn from_start_and_shape(start: &[i64], shape: &[usize]) -> Self {
        Self {
            ranges: start
                .iter()
                .zip(shape)
                .map(|(&s, &n)| s..s + n as i64)
                .collect()
        }
    }


    pub fn rank(&self) -> usize {
        self.ranges.len()
    }


    /**
     * Return the number of indexes on each axis.
     */
    pub fn dim(&self) -> Vec<usize> {
        self.ranges.iter().map(|r| (r.end - r.start) as usize).collect()
    }


    /**
     * Return the number of elements in this index space.
     */
    pub fn len(&self) -> usize {
        self.dim().iter().product()
    }


    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }


    /**
     * Return the minimum index (inclusive).
     */
    pub fn start(&self) -> Vec<i64> {
        self.ranges.iter().map(|r| r.start).collect()
    }


    /**
     * Determine whether two index spaces share at least one index. Spaces
     * that line up end-to-end do not overlap.
     */
    pub fn overlaps(&self, other: &Self) -> bool {
        self.rank() == other.rank() &&
        self.ranges.iter().zip(&other.ranges).all(|(s, o)| s.start.max(o.start) < s.end.min(o.end))
    }


    /**
     * Return the smallest index space containing both this one and another.
     */
    pub fn bounding_union(&self, other: &Self) -> Self {
        Self {
            ranges: self.ranges
                .iter()
                .zip(&other.ranges)
                .map(|(s, o)| s.start.min(o.start)..s.end.max(o.end))
                .collect()
        }
    }


    /**
     * Return the linear offset for the given index, in a row-major memory
     * buffer aligned with the start of this index space.
     */
    pub fn row_major_offset(&self, index: &[i64]) -> usize {
        self.ranges.iter().zip(index).fold(0, |offset, (r, i)| {
            offset * (r.end - r.start) as usize + (i - r.start) as usize
        })
    }


    /**
     * Return an iterator which traverses the index space in row-major order
     * (C-like; the final index increases fastest).
     */
    pub fn iter(&self) -> impl Iterator<Item = Vec<i64>> + '_ {
        let total = self.len();
        let dim = self.dim();
        let start = self.start();

        (0..total).map(move |mut n| {
            let mut index = vec![0; dim.len()];
            for axis in (0..dim.len()).rev() {
                index[axis] = start[axis] + (n % dim[axis]) as i64;
                n /= dim[axis];
            }
            index
        })
    }
}




/**
 * Convert a flat row-major offset into a multi-index for the given shape.
 */
pub fn unravel_index(mut offset: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];

    for axis in (0..shape.len()).rev() {
        index[axis] = offset % shape[axis];
        offset /= shape[axis];
    }
    index
}




/**
 * Convert a multi-index into a flat row-major offset for the given shape.
 */
pub fn ravel_index(index: &[usize], shape: &[usize]) -> usize {
    index.iter().zip(shape).fold(0, |offset, (i, n)| offset * n + i)
}




/**
 * Return the row-major strides (in elements) of an array with the given
 * shape.
 */
pub fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];

    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}
