use core::fmt;
use core::hash::{Hash, Hasher};
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::index_space::{strides, unravel_index};




/// Refinement level carried by grids that are not part of a mesh-refined
/// hierarchy.
pub const NO_REFINEMENT: i32 = -1;




/// Relative tolerance (in units of the cell spacing) used when comparing
/// grid coordinates.
pub(crate) const COORDINATE_TOLERANCE: f64 = 1e-10;




pub(crate) fn coordinates_close(a: f64, b: f64, spacing: f64) -> bool {
    (a - b).abs() <= COORDINATE_TOLERANCE * spacing.abs().max(1e-300)
}




/**
 * An immutable, cell-centered, uniformly spaced rectilinear lattice in any
 * number of dimensions. Cell `k` along axis `i` is centered at `x0[i] + k *
 * dx[i]`; `x0` is the center of the first cell and `x1` the center of the
 * last one.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct UniformGrid {
    shape: Vec<usize>,
    x0: Vec<f64>,
    dx: Vec<f64>,
    ref_level: i32,
    time: Option<f64>,
    iteration: Option<u64>,
    num_ghost: Vec<usize>,
}




/**
 * Decoded grid fields before validation.
 */
#[derive(Deserialize)]
struct RawGrid {
    shape: Vec<usize>,
    x0: Vec<f64>,
    dx: Vec<f64>,
    ref_level: i32,
    time: Option<f64>,
    iteration: Option<u64>,
    num_ghost: Vec<usize>,
}




impl TryFrom<RawGrid> for UniformGrid {
    type Error = Error;

    fn try_from(raw: RawGrid) -> Result<Self> {
        let mut grid = Self::from_spacing(&raw.shape, &raw.x0, &raw.dx)?
            .with_ref_level(raw.ref_level)
            .with_num_ghost(&raw.num_ghost)?;
        grid.time = raw.time;
        grid.iteration = raw.iteration;
        Ok(grid)
    }
}




/**
 * The three representations of grid coordinates.
 */
#[derive(Clone, Debug, PartialEq)]
pub enum Coordinates {
    /// One 1-D array per axis.
    Axes(Vec<Vec<f64>>),
    /// One full array per axis with the first two array axes swapped
    /// (`xy` indexing), matching the plot-ready data layout.
    Meshgrid(Vec<Vec<f64>>),
    /// One full array per axis, shaped like the grid (`ij` indexing).
    SameShape(Vec<Vec<f64>>),
}




// ============================================================================
impl Coordinates {
    pub fn into_inner(self) -> Vec<Vec<f64>> {
        match self {
            Self::Axes(c) | Self::Meshgrid(c) | Self::SameShape(c) => c,
        }
    }
}




// ============================================================================
impl UniformGrid {


    /**
     * Create a grid from its shape and the centers of its first and last
     * cells. Axes with a single cell must have `x0 == x1`; they get unit
     * spacing.
     */
    pub fn from_corners(shape: &[usize], x0: &[f64], x1: &[f64]) -> Result<Self> {
        check_length(shape.len(), x0.len())?;
        check_length(shape.len(), x1.len())?;
        check_shape(shape)?;

        let dx = shape
            .iter()
            .zip(x0.iter().zip(x1))
            .map(|(&n, (&a, &b))| {
                if n == 1 {
                    if a == b {
                        Ok(1.0)
                    } else {
                        Err(Error::InvalidArgument(format!(
                            "axis with one cell needs x0 == x1, got {} and {}", a, b)))
                    }
                } else {
                    Ok((b - a) / (n - 1) as f64)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_spacing(shape, x0, &dx)
    }


    /**
     * Create a grid from its shape, the center of its first cell, and the
     * cell spacing.
     */
    pub fn from_spacing(shape: &[usize], x0: &[f64], dx: &[f64]) -> Result<Self> {
        check_length(shape.len(), x0.len())?;
        check_length(shape.len(), dx.len())?;
        check_shape(shape)?;

        if let Some(d) = dx.iter().find(|d| !(d.is_finite() && **d > 0.0)) {
            return Err(Error::InvalidArgument(format!("grid spacing must be positive, got {}", d)));
        }
        if let Some(x) = x0.iter().find(|x| !x.is_finite()) {
            return Err(Error::InvalidArgument(format!("grid origin must be finite, got {}", x)));
        }

        Ok(Self {
            shape: shape.to_vec(),
            x0: x0.to_vec(),
            dx: dx.to_vec(),
            ref_level: NO_REFINEMENT,
            time: None,
            iteration: None,
            num_ghost: vec![0; shape.len()],
        })
    }


    pub fn with_ref_level(mut self, ref_level: i32) -> Self {
        self.ref_level = ref_level;
        self
    }


    pub fn with_time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }


    pub fn with_iteration(mut self, iteration: u64) -> Self {
        self.iteration = Some(iteration);
        self
    }


    /**
     * Mark the outermost `num_ghost[i]` cells on both sides of axis `i` as
     * ghost zones.
     */
    pub fn with_num_ghost(mut self, num_ghost: &[usize]) -> Result<Self> {
        check_length(self.num_dimensions(), num_ghost.len())?;

        if self.shape.iter().zip(num_ghost).any(|(&n, &g)| 2 * g >= n && g > 0) {
            return Err(Error::InvalidArgument(format!(
                "ghost zones {:?} leave no interior in shape {:?}", num_ghost, self.shape)));
        }
        self.num_ghost = num_ghost.to_vec();
        Ok(self)
    }


    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn x0(&self) -> &[f64] {
        &self.x0
    }

    pub fn origin(&self) -> &[f64] {
        &self.x0
    }

    pub fn dx(&self) -> &[f64] {
        &self.dx
    }

    pub fn ref_level(&self) -> i32 {
        self.ref_level
    }

    pub fn time(&self) -> Option<f64> {
        self.time
    }

    pub fn iteration(&self) -> Option<u64> {
        self.iteration
    }

    pub fn num_ghost(&self) -> &[usize] {
        &self.num_ghost
    }


    /**
     * Return the center of the last cell on each axis.
     */
    pub fn x1(&self) -> Vec<f64> {
        self.x0
            .iter()
            .zip(&self.dx)
            .zip(&self.shape)
            .map(|((x, d), &n)| x + (n - 1) as f64 * d)
            .collect()
    }


    pub fn num_dimensions(&self) -> usize {
        self.shape.len()
    }


    /**
     * Return which axes have more than one cell.
     */
    pub fn extended_dimensions(&self) -> Vec<bool> {
        self.shape.iter().map(|&n| n > 1).collect()
    }


    pub fn num_extended_dimensions(&self) -> usize {
        self.shape.iter().filter(|&&n| n > 1).count()
    }


    pub fn num_cells(&self) -> usize {
        self.shape.iter().product()
    }


    /**
     * Return the volume of one cell.
     */
    pub fn dv(&self) -> f64 {
        self.dx.iter().product()
    }


    pub fn volume(&self) -> f64 {
        self.dv() * self.num_cells() as f64
    }


    /**
     * Return the lower corner of the first cell (not its center).
     */
    pub fn lowest_vertex(&self) -> Vec<f64> {
        self.x0.iter().zip(&self.dx).map(|(x, d)| x - 0.5 * d).collect()
    }


    /**
     * Return the upper corner of the last cell (not its center).
     */
    pub fn highest_vertex(&self) -> Vec<f64> {
        self.x1().iter().zip(&self.dx).map(|(x, d)| x + 0.5 * d).collect()
    }


    /**
     * Return one array of cell-center coordinates per axis.
     */
    pub fn coordinates_1d(&self) -> Vec<Vec<f64>> {
        self.shape
            .iter()
            .zip(self.x0.iter().zip(&self.dx))
            .map(|(&n, (x, d))| (0..n).map(|k| x + k as f64 * d).collect())
            .collect()
    }


    /**
     * Return, for each axis, a row-major array shaped like the grid whose
     * entries are that axis' coordinate.
     */
    pub fn coordinates_same_shape(&self) -> Vec<Vec<f64>> {
        let strides = strides(&self.shape);

        (0..self.num_dimensions())
            .map(|axis| {
                (0..self.num_cells())
                    .map(|n| self.x0[axis] + ((n / strides[axis]) % self.shape[axis]) as f64 * self.dx[axis])
                    .collect()
            })
            .collect()
    }


    /**
     * Return, for each axis, a row-major array whose first two axes are
     * swapped with respect to the grid (`xy` indexing). With fewer than two
     * dimensions this is the same as `coordinates_same_shape`.
     */
    pub fn coordinates_meshgrid(&self) -> Vec<Vec<f64>> {
        if self.num_dimensions() < 2 {
            return self.coordinates_same_shape();
        }
        let mut mesh_shape = self.shape.clone();
        mesh_shape.swap(0, 1);

        (0..self.num_dimensions())
            .map(|axis| {
                (0..self.num_cells())
                    .map(|n| {
                        let mut index = unravel_index(n, &mesh_shape);
                        index.swap(0, 1);
                        self.x0[axis] + index[axis] as f64 * self.dx[axis]
                    })
                    .collect()
            })
            .collect()
    }


    /**
     * Return the grid coordinates in one of three representations. At most
     * one of the two flags may be set.
     */
    pub fn coordinates(&self, as_meshgrid: bool, as_same_shape: bool) -> Result<Coordinates> {
        match (as_meshgrid, as_same_shape) {
            (true, true) => Err(Error::InvalidArgument(
                "as_meshgrid and as_same_shape are mutually exclusive".into())),
            (true, false) => Ok(Coordinates::Meshgrid(self.coordinates_meshgrid())),
            (false, true) => Ok(Coordinates::SameShape(self.coordinates_same_shape())),
            (false, false) => Ok(Coordinates::Axes(self.coordinates_1d())),
        }
    }


    /**
     * Return the coordinate of the cell with the given index.
     */
    pub fn coordinate_at(&self, index: &[usize]) -> Result<Vec<f64>> {
        if index.len() != self.num_dimensions() || index.iter().zip(&self.shape).any(|(i, n)| i >= n) {
            return Err(Error::IndexOutOfBounds { index: index.to_vec(), shape: self.shape.clone() });
        }
        Ok(index
            .iter()
            .zip(self.x0.iter().zip(&self.dx))
            .map(|(&i, (x, d))| x + i as f64 * d)
            .collect())
    }


    /**
     * Determine whether a point lies inside the grid, including the half
     * cell around the outermost cell centers.
     */
    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.num_dimensions() &&
        point
            .iter()
            .zip(self.lowest_vertex().iter().zip(self.highest_vertex()))
            .all(|(p, (lo, hi))| *lo <= *p && *p <= hi)
    }


    /**
     * Return the position of a point in units of cells from `x0`.
     */
    pub fn fractional_index(&self, point: &[f64]) -> Vec<f64> {
        point
            .iter()
            .zip(self.x0.iter().zip(&self.dx))
            .map(|(p, (x, d))| (p - x) / d)
            .collect()
    }


    /**
     * Return the index of the cell nearest to a point, clamped to the grid.
     */
    pub fn nearest_index(&self, point: &[f64]) -> Vec<usize> {
        self.fractional_index(point)
            .iter()
            .zip(&self.shape)
            .map(|(f, &n)| f.round().clamp(0.0, (n - 1) as f64) as usize)
            .collect()
    }


    /**
     * Determine whether two grids describe the same lattice, disregarding
     * time, iteration, and refinement level.
     */
    pub fn same_lattice(&self, other: &Self) -> bool {
        self.shape == other.shape &&
        self.dx.iter().zip(&other.dx).all(|(a, b)| coordinates_close(*a, *b, *a)) &&
        self.x0.iter().zip(&other.x0).zip(&self.dx).all(|((a, b), d)| coordinates_close(*a, *b, *d))
    }


    /**
     * Return an error describing why another grid is not the same lattice.
     */
    pub(crate) fn check_same_lattice(&self, other: &Self) -> Result<()> {
        if self.same_lattice(other) {
            Ok(())
        } else {
            Err(Error::GridMismatch(format!(
                "shape {:?} x0 {:?} dx {:?} vs shape {:?} x0 {:?} dx {:?}",
                self.shape, self.x0, self.dx, other.shape, other.x0, other.dx)))
        }
    }


    /**
     * Return the grid without its ghost zones.
     */
    pub fn ghost_zones_removed(&self) -> Self {
        Self {
            shape: self.shape.iter().zip(&self.num_ghost).map(|(n, g)| n - 2 * g).collect(),
            x0: self.x0.iter().zip(&self.dx).zip(&self.num_ghost).map(|((x, d), &g)| x + g as f64 * d).collect(),
            dx: self.dx.clone(),
            ref_level: self.ref_level,
            time: self.time,
            iteration: self.iteration,
            num_ghost: vec![0; self.num_dimensions()],
        }
    }


    /**
     * Return the grid without the axes that have a single cell. A grid with
     * no extended axis cannot be reduced.
     */
    pub fn flat_dimensions_removed(&self) -> Result<Self> {
        self.with_axes_kept(&self.extended_dimensions())
    }


    /**
     * Return a grid restricted to the axes flagged in `keep`.
     */
    pub(crate) fn with_axes_kept(&self, keep: &[bool]) -> Result<Self> {
        if !keep.iter().any(|&k| k) {
            return Err(Error::InvalidArgument("cannot reduce a grid to zero dimensions".into()));
        }
        let pick = |v: &[f64]| -> Vec<f64> {
            v.iter().zip(keep).filter(|(_, &k)| k).map(|(x, _)| *x).collect()
        };

        Ok(Self {
            shape: self.shape.iter().zip(keep).filter(|(_, &k)| k).map(|(n, _)| *n).collect(),
            x0: pick(&self.x0),
            dx: pick(&self.dx),
            ref_level: self.ref_level,
            time: self.time,
            iteration: self.iteration,
            num_ghost: self.num_ghost.iter().zip(keep).filter(|(_, &k)| k).map(|(g, _)| *g).collect(),
        })
    }
}




// ============================================================================
impl PartialEq for UniformGrid {
    fn eq(&self, other: &Self) -> bool {
        let same_time = match (self.time, other.time) {
            (None, None) => true,
            (Some(a), Some(b)) => coordinates_close(a, b, a.abs().max(1.0)),
            _ => false,
        };
        self.same_lattice(other) &&
        self.ref_level == other.ref_level &&
        self.iteration == other.iteration &&
        self.num_ghost == other.num_ghost &&
        same_time
    }
}

impl Hash for UniformGrid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shape.hash(state);
        self.ref_level.hash(state);
        self.iteration.hash(state);
        self.num_ghost.hash(state);
    }
}

impl fmt::Display for UniformGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Num dimensions   = {}", self.num_dimensions())?;
        writeln!(f, "Shape            = {:?}", self.shape)?;
        writeln!(f, "Num ghost zones  = {:?}", self.num_ghost)?;
        writeln!(f, "Ref level        = {}", self.ref_level)?;
        writeln!(f, "Spacing          = {:?}", self.dx)?;
        writeln!(f, "x0               = {:?}", self.x0)?;
        writeln!(f, "x1               = {:?}", self.x1())?;
        writeln!(f, "Volume           = {}", self.volume())?;
        match self.time {
            Some(t) => writeln!(f, "Time             = {}", t)?,
            None => writeln!(f, "Time             = None")?,
        }
        match self.iteration {
            Some(i) => write!(f, "Iteration        = {}", i),
            None => write!(f, "Iteration        = None"),
        }
    }
}




fn check_length(expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { expected, found })
    }
}

fn check_shape(shape: &[usize]) -> Result<()> {
    if shape.is_empty() {
        Err(Error::InvalidArgument("grid must have at least one dimension".into()))
    } else if shape.iter().any(|&n| n == 0) {
        Err(Error::InvalidArgument(format!("grid shape must be positive, got {:?}", shape)))
    } else {
        Ok(())
    }
}
