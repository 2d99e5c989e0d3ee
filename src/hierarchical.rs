//! Mesh-refined data: many `UniformGridData` components grouped by
//! refinement level. Components of one level that tile a rectangle (as
//! produced by a domain decomposition over processes) are merged into a
//! single field at construction; components that do not (several refinement
//! centers) are kept as a list ordered by origin.

use core::cmp::Ordering;
use core::fmt;
use std::collections::BTreeMap;
use log::debug;
use rayon::prelude::*;
use crate::error::{Error, Result};
use crate::grid::{coordinates_close, UniformGrid};
use crate::grid_data::UniformGridData;
use crate::index_space::IndexSpace;
use crate::interp::{Method, OutOfBounds, ResampleOptions};
use crate::numeric::{impl_field_ops, NumericField};




/// Tolerance, in cells, when checking that a component sits on the lattice
/// of its level.
const ALIGNMENT_TOLERANCE: f64 = 1e-6;




/**
 * The data available at one refinement level: either one field or several
 * disjoint components.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LevelData<'a> {
    Single(&'a UniformGridData),
    Multiple(&'a [UniformGridData]),
}




// ============================================================================
impl<'a> LevelData<'a> {

    pub fn as_slice(&self) -> &'a [UniformGridData] {
        match *self {
            Self::Single(field) => std::slice::from_ref(field),
            Self::Multiple(fields) => fields,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}




/**
 * A multi-resolution field made of `UniformGridData` components tagged with
 * a refinement level. Levels may be sparse; finer levels have smaller
 * spacing. Ghost zones are stripped from all components at construction.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct HierarchicalGridData {
    levels: BTreeMap<u32, Vec<UniformGridData>>,
    // first and last keys of `levels`; every level holds at least one component
    coarsest_level: u32,
    finest_level: u32,
}




// ============================================================================
impl HierarchicalGridData {


    /**
     * Build the hierarchy from a flat list of components. Every component
     * must have a non-negative refinement level, all must have the same
     * number of dimensions, and components of one level must share one
     * spacing.
     */
    pub fn new(components: Vec<UniformGridData>) -> Result<Self> {
        let first = components
            .first()
            .ok_or_else(|| Error::InvalidArgument("no components given".into()))?;
        let num_dimensions = first.num_dimensions();
        let mut grouped: BTreeMap<u32, Vec<UniformGridData>> = BTreeMap::new();
        let mut coarsest_level = u32::MAX;
        let mut finest_level = 0;

        for component in components {
            if component.num_dimensions() != num_dimensions {
                return Err(Error::DimensionMismatch { expected: num_dimensions, found: component.num_dimensions() });
            }
            let level = u32::try_from(component.ref_level()).map_err(|_| {
                Error::InvalidArgument(format!("component has no refinement level ({})", component.ref_level()))
            })?;
            coarsest_level = coarsest_level.min(level);
            finest_level = finest_level.max(level);
            grouped.entry(level).or_default().push(component.ghost_zones_removed());
        }

        let mut levels = BTreeMap::new();

        for (level, mut fields) in grouped {
            let dx = fields[0].dx().to_vec();

            if let Some(other) = fields.iter().find(|f| !same_spacing(f.dx(), &dx)) {
                return Err(Error::GridMismatch(format!(
                    "level {} has spacings {:?} and {:?}", level, dx, other.dx())));
            }
            fields.sort_by(|a, b| compare_origins(a.x0(), b.x0()));

            let fields = match merge_tiles(&fields)? {
                Some(merged) => vec![merged],
                None => fields,
            };
            debug!("refinement level {} has {} component(s)", level, fields.len());
            levels.insert(level, fields);
        }
        Ok(Self { levels, coarsest_level, finest_level })
    }


    /**
     * Return the data at a refinement level: the merged field, or all
     * components when the level has several.
     */
    pub fn level(&self, level: u32) -> Result<LevelData<'_>> {
        match self.levels.get(&level) {
            Some(fields) if fields.len() == 1 => Ok(LevelData::Single(&fields[0])),
            Some(fields) => Ok(LevelData::Multiple(fields)),
            None => Err(Error::LevelNotFound(level)),
        }
    }


    /**
     * Return the single field at a refinement level. Fails with
     * `AmbiguousComponents` if the level has several disjoint components.
     */
    pub fn get_level(&self, level: u32) -> Result<&UniformGridData> {
        match self.level(level)? {
            LevelData::Single(field) => Ok(field),
            LevelData::Multiple(_) => Err(Error::AmbiguousComponents(level)),
        }
    }


    /**
     * Iterate over all components, coarsest level first.
     */
    pub fn components(&self) -> impl Iterator<Item = &UniformGridData> {
        self.levels.values().flatten()
    }


    pub fn num_components(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }


    pub fn refinement_levels(&self) -> Vec<u32> {
        self.levels.keys().copied().collect()
    }


    pub fn num_refinement_levels(&self) -> usize {
        self.levels.len()
    }


    pub fn coarsest_level(&self) -> u32 {
        self.coarsest_level
    }


    pub fn finest_level(&self) -> u32 {
        self.finest_level
    }


    pub fn dx_at_level(&self, level: u32) -> Result<&[f64]> {
        Ok(self.level(level)?.as_slice()[0].dx())
    }


    pub fn coarsest_dx(&self) -> &[f64] {
        self.levels[&self.coarsest_level()][0].dx()
    }


    pub fn finest_dx(&self) -> &[f64] {
        self.levels[&self.finest_level()][0].dx()
    }


    pub fn num_dimensions(&self) -> usize {
        self.first().num_dimensions()
    }


    pub fn time(&self) -> Option<f64> {
        self.first().time()
    }


    pub fn iteration(&self) -> Option<u64> {
        self.first().iteration()
    }


    /**
     * Return the lowest cell center over all components.
     */
    pub fn x0(&self) -> Vec<f64> {
        self.components().fold(vec![f64::INFINITY; self.num_dimensions()], |lo, c| {
            lo.iter().zip(c.x0()).map(|(a, b)| a.min(*b)).collect()
        })
    }


    /**
     * Return the highest cell center over all components.
     */
    pub fn x1(&self) -> Vec<f64> {
        self.components().fold(vec![f64::NEG_INFINITY; self.num_dimensions()], |hi, c| {
            hi.iter().zip(c.x1()).map(|(a, b)| a.max(b)).collect()
        })
    }


    pub fn min(&self) -> f64 {
        self.components().map(UniformGridData::min).fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.components().map(UniformGridData::max).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn abs_min(&self) -> f64 {
        self.components().map(UniformGridData::abs_min).fold(f64::INFINITY, f64::min)
    }

    pub fn abs_max(&self) -> f64 {
        self.components().map(UniformGridData::abs_max).fold(f64::NEG_INFINITY, f64::max)
    }


    /**
     * Return the component of the finest level that contains a point,
     * falling back to coarser levels.
     */
    pub fn finest_component_at_point(&self, point: &[f64]) -> Result<&UniformGridData> {
        if point.len() != self.num_dimensions() {
            return Err(Error::DimensionMismatch { expected: self.num_dimensions(), found: point.len() });
        }
        self.levels
            .values()
            .rev()
            .flatten()
            .find(|c| c.grid().contains(point))
            .ok_or_else(|| Error::OutOfDomain(point.to_vec()))
    }


    /**
     * Evaluate the field at a point using the finest component that
     * contains it.
     */
    pub fn evaluate(&self, point: &[f64]) -> Result<f64> {
        self.finest_component_at_point(point)?.evaluate(point)
    }


    pub fn evaluate_points(&self, points: &[Vec<f64>]) -> Result<Vec<f64>> {
        points.par_iter().map(|p| self.evaluate(p)).collect()
    }


    /**
     * Combine all refinement levels into one field at the finest spacing,
     * spanning every component. Each cell takes its value from the finest
     * component containing it: the nearest cell of that component, or a
     * multilinear interpolation of it when `resample` is true. Cells covered
     * by no component are an `OutOfDomain` error.
     */
    pub fn merge_refinement_levels(&self, resample: bool) -> Result<UniformGridData> {
        let x0 = self.x0();
        let x1 = self.x1();
        let dx = self.finest_dx();
        let shape: Vec<_> = x0
            .iter()
            .zip(&x1)
            .zip(dx)
            .map(|((a, b), d)| ((b - a) / d).round() as usize + 1)
            .collect();

        let grid = self.tagged(UniformGrid::from_spacing(&shape, &x0, dx)?);
        self.to_uniform_grid_data_from_grid(&grid, resample)
    }


    /**
     * Sample the hierarchy on the grid with the given shape and corners,
     * with the same level selection as `merge_refinement_levels`.
     */
    pub fn to_uniform_grid_data(&self, shape: &[usize], x0: &[f64], x1: &[f64], resample: bool) -> Result<UniformGridData> {
        let grid = self.tagged(UniformGrid::from_corners(shape, x0, x1)?);
        self.to_uniform_grid_data_from_grid(&grid, resample)
    }


    /**
     * Sample the hierarchy on every cell of `grid`.
     */
    pub fn to_uniform_grid_data_from_grid(&self, grid: &UniformGrid, resample: bool) -> Result<UniformGridData> {
        if grid.num_dimensions() != self.num_dimensions() {
            return Err(Error::DimensionMismatch { expected: self.num_dimensions(), found: grid.num_dimensions() });
        }
        debug!("sampling {} level(s) onto {:?} (resample = {})", self.num_refinement_levels(), grid.shape(), resample);

        let method = if resample { Method::Linear } else { Method::Nearest };
        let options = ResampleOptions::new(method, OutOfBounds::Extrapolate);
        let coordinates = grid.coordinates_same_shape();

        let data = (0..grid.num_cells())
            .into_par_iter()
            .map(|n| {
                let point: Vec<_> = coordinates.iter().map(|c| c[n]).collect();
                self.finest_component_at_point(&point)?.evaluate_with(&point, options)
            })
            .collect::<Result<Vec<_>>>()?;

        UniformGridData::new(grid.clone(), data)
    }


    fn first(&self) -> &UniformGridData {
        &self.levels[&self.coarsest_level()][0]
    }


    fn tagged(&self, grid: UniformGrid) -> UniformGrid {
        let grid = match self.time() {
            Some(t) => grid.with_time(t),
            None => grid,
        };
        match self.iteration() {
            Some(i) => grid.with_iteration(i),
            None => grid,
        }
    }
}




/**
 * Merge components that exactly tile their bounding box into a single
 * field. Returns `None` when the components are misaligned with the level
 * lattice, overlap, or leave gaps.
 */
fn merge_tiles(fields: &[UniformGridData]) -> Result<Option<UniformGridData>> {
    if fields.len() < 2 {
        return Ok(None);
    }
    let dx = fields[0].dx();
    let origin = fields.iter().fold(fields[0].x0().to_vec(), |lo, f| {
        lo.iter().zip(f.x0()).map(|(a, b)| a.min(*b)).collect()
    });

    let mut spaces = Vec::with_capacity(fields.len());

    for field in fields {
        let mut start = Vec::with_capacity(dx.len());

        for ((x, o), d) in field.x0().iter().zip(&origin).zip(dx) {
            let offset = (x - o) / d;
            if (offset - offset.round()).abs() > ALIGNMENT_TOLERANCE {
                return Ok(None);
            }
            start.push(offset.round() as i64);
        }
        spaces.push(IndexSpace::from_start_and_shape(&start, field.shape()));
    }

    for (i, a) in spaces.iter().enumerate() {
        if spaces[i + 1..].iter().any(|b| a.overlaps(b)) {
            return Ok(None);
        }
    }
    let bounding = spaces[1..].iter().fold(spaces[0].clone(), |acc, s| acc.bounding_union(s));

    if spaces.iter().map(IndexSpace::len).sum::<usize>() != bounding.len() {
        return Ok(None);
    }
    let mut data = vec![0.0; bounding.len()];

    for (field, space) in fields.iter().zip(&spaces) {
        for (value, index) in field.data().iter().zip(space.iter()) {
            data[bounding.row_major_offset(&index)] = *value;
        }
    }

    let first = fields[0].grid();
    let mut grid = UniformGrid::from_spacing(&bounding.dim(), &origin, dx)?.with_ref_level(first.ref_level());

    if let Some(t) = first.time() {
        grid = grid.with_time(t);
    }
    if let Some(i) = first.iteration() {
        grid = grid.with_iteration(i);
    }
    debug!("merged {} components into shape {:?}", fields.len(), bounding.dim());
    UniformGridData::new(grid, data).map(Some)
}




fn same_spacing(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| coordinates_close(*x, *y, *x))
}




fn compare_origins(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.partial_cmp(y).unwrap_or(Ordering::Equal))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}




// ============================================================================
impl NumericField for HierarchicalGridData {
    fn apply_unary<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync
    {
        let levels = self.levels
            .iter()
            .map(|(&level, fields)| (level, fields.iter().map(|c| c.apply_unary(&f)).collect()))
            .collect();

        Self { levels, ..*self }
    }

    fn apply_binary<F>(&self, other: &Self, f: F) -> Result<Self>
    where
        F: Fn(f64, f64) -> f64 + Send + Sync
    {
        if self.refinement_levels() != other.refinement_levels() {
            return Err(Error::GridMismatch(format!(
                "refinement levels {:?} vs {:?}", self.refinement_levels(), other.refinement_levels())));
        }
        let mut levels = BTreeMap::new();

        for ((&level, a), b) in self.levels.iter().zip(other.levels.values()) {
            if a.len() != b.len() {
                return Err(Error::GridMismatch(format!(
                    "level {} has {} vs {} components", level, a.len(), b.len())));
            }
            let fields = a
                .iter()
                .zip(b)
                .map(|(x, y)| x.apply_binary(y, &f))
                .collect::<Result<Vec<_>>>()?;
            levels.insert(level, fields);
        }
        Ok(Self { levels, coarsest_level: self.coarsest_level, finest_level: self.finest_level })
    }
}

impl_field_ops!(HierarchicalGridData);

impl fmt::Display for HierarchicalGridData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Num dimensions   = {}", self.num_dimensions())?;
        writeln!(f, "x0               = {:?}", self.x0())?;
        writeln!(f, "x1               = {:?}", self.x1())?;
        writeln!(f, "Refinement levels (components, spacing):")?;
        for (level, fields) in &self.levels {
            writeln!(f, "  {} ({}, {:?})", level, fields.len(), fields[0].dx())?;
        }
        writeln!(f, "Spacing at coarsest level ({}) = {:?}", self.coarsest_level(), self.coarsest_dx())?;
        write!(f, "Spacing at finest level ({})   = {:?}", self.finest_level(), self.finest_dx())
    }
}
