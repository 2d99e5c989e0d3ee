use core::fmt;
use std::sync::Arc;
use log::debug;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::grid::UniformGrid;
use crate::index_space::{ravel_index, strides, unravel_index, IndexSpace};
use crate::interp::{self, Method, OutOfBounds, ResampleOptions, SplineInterpolant};
use crate::numeric::{impl_field_ops, NumericField};




/**
 * A scalar field sampled on the cells of one `UniformGrid`. The backing
 * array is row-major in grid index order: axis 0 (x) is the slowest and the
 * last axis the fastest. `data_xyz` gives the axis-reversed, plot-ready
 * layout.
 *
 * Fields are immutable; every operation returns a new field. The spline
 * interpolant used by `evaluate` is built on first use and cached.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UniformGridData {
    grid: UniformGrid,
    data: Vec<f64>,
    #[serde(skip)]
    spline: OnceCell<Arc<SplineInterpolant>>,
}




// ============================================================================
impl UniformGridData {


    /**
     * Wrap an array of values laid out row-major over `grid`.
     */
    pub fn new(grid: UniformGrid, data: Vec<f64>) -> Result<Self> {
        if data.len() != grid.num_cells() {
            return Err(Error::ShapeMismatch { expected: grid.num_cells(), found: data.len() });
        }
        Ok(Self { grid, data, spline: OnceCell::new() })
    }


    /**
     * Generate a field by evaluating a function at every cell center.
     */
    pub fn from_function<F>(grid: UniformGrid, f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync
    {
        let shape = grid.shape().to_vec();
        let x0 = grid.x0().to_vec();
        let dx = grid.dx().to_vec();

        let data = (0..grid.num_cells())
            .into_par_iter()
            .map(|n| {
                let point: Vec<_> = unravel_index(n, &shape)
                    .iter()
                    .zip(x0.iter().zip(&dx))
                    .map(|(&i, (x, d))| x + i as f64 * d)
                    .collect();
                f(&point)
            })
            .collect();

        Self { grid, data, spline: OnceCell::new() }
    }


    /**
     * Generate the `N` components of a vector field by evaluating a function
     * returning `N` values at every cell center.
     */
    pub fn from_function_n<F, const N: usize>(grid: UniformGrid, f: F) -> [Self; N]
    where
        F: Fn(&[f64]) -> [f64; N] + Send + Sync
    {
        let coordinates = grid.coordinates_same_shape();
        let values: Vec<[f64; N]> = (0..grid.num_cells())
            .into_par_iter()
            .map(|n| {
                let point: Vec<_> = coordinates.iter().map(|c| c[n]).collect();
                f(&point)
            })
            .collect();

        std::array::from_fn(|k| Self {
            grid: grid.clone(),
            data: values.iter().map(|v| v[k]).collect(),
            spline: OnceCell::new(),
        })
    }


    /**
     * Reduce the components of a vector field to a scalar field by applying
     * `f` to the `N` values of each cell. All components must share one
     * lattice.
     */
    pub fn combine<F, const N: usize>(components: &[Self; N], f: F) -> Result<Self>
    where
        F: Fn([f64; N]) -> f64 + Send + Sync
    {
        let first = components
            .first()
            .ok_or_else(|| Error::InvalidArgument("vector field has no components".into()))?;

        for c in &components[1..] {
            first.grid.check_same_lattice(&c.grid)?;
        }
        let data = (0..first.data.len())
            .into_par_iter()
            .map(|n| f(std::array::from_fn(|k| components[k].data[n])))
            .collect();

        Ok(Self { grid: first.grid.clone(), data, spline: OnceCell::new() })
    }


    /**
     * Generate a field by evaluating a function on the grid with the given
     * shape and corners.
     */
    pub fn sample_function<F>(f: F, shape: &[usize], x0: &[f64], x1: &[f64], ref_level: i32) -> Result<Self>
    where
        F: Fn(&[f64]) -> f64 + Send + Sync
    {
        let grid = UniformGrid::from_corners(shape, x0, x1)?.with_ref_level(ref_level);
        Ok(Self::from_function(grid, f))
    }


    pub fn grid(&self) -> &UniformGrid {
        &self.grid
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.grid.shape()
    }

    pub fn num_dimensions(&self) -> usize {
        self.grid.num_dimensions()
    }

    pub fn x0(&self) -> &[f64] {
        self.grid.x0()
    }

    pub fn x1(&self) -> Vec<f64> {
        self.grid.x1()
    }

    pub fn dx(&self) -> &[f64] {
        self.grid.dx()
    }

    pub fn dv(&self) -> f64 {
        self.grid.dv()
    }

    pub fn ref_level(&self) -> i32 {
        self.grid.ref_level()
    }

    pub fn time(&self) -> Option<f64> {
        self.grid.time()
    }

    pub fn iteration(&self) -> Option<u64> {
        self.grid.iteration()
    }


    /**
     * Return the value stored at a cell index.
     */
    pub fn value_at_index(&self, index: &[usize]) -> Result<f64> {
        if index.len() != self.num_dimensions() || index.iter().zip(self.shape()).any(|(i, n)| i >= n) {
            return Err(Error::IndexOutOfBounds { index: index.to_vec(), shape: self.shape().to_vec() });
        }
        Ok(self.data[ravel_index(index, self.shape())])
    }


    /**
     * Return the one-dimensional coordinates of the underlying grid.
     */
    pub fn coordinates_from_grid(&self) -> Vec<Vec<f64>> {
        self.grid.coordinates_1d()
    }


    /**
     * Return the shape of the `data_xyz` array.
     */
    pub fn shape_xyz(&self) -> Vec<usize> {
        self.shape().iter().rev().copied().collect()
    }


    /**
     * Return a copy of the data with the axis order reversed, so that the
     * first array index runs over the last grid axis. In 2D this puts `y`
     * on rows and `x` on columns, which is what image plotting expects.
     */
    pub fn data_xyz(&self) -> Vec<f64> {
        let shape = self.shape();
        let reversed = self.shape_xyz();

        (0..self.data.len())
            .map(|n| {
                let mut index = unravel_index(n, &reversed);
                index.reverse();
                self.data[ravel_index(&index, shape)]
            })
            .collect()
    }


    fn spline(&self) -> &SplineInterpolant {
        self.spline.get_or_init(|| Arc::new(SplineInterpolant::new(&self.grid, &self.data)))
    }


    /**
     * Evaluate the field at an arbitrary point with the cached cubic spline.
     * Points outside the grid are an `OutOfDomain` error.
     */
    pub fn evaluate(&self, point: &[f64]) -> Result<f64> {
        self.evaluate_with(point, ResampleOptions::new(Method::Spline, OutOfBounds::Error))
    }


    /**
     * Evaluate the field at an arbitrary point with the given interpolation
     * method and out-of-domain policy.
     */
    pub fn evaluate_with(&self, point: &[f64], options: ResampleOptions) -> Result<f64> {
        if point.len() != self.num_dimensions() {
            return Err(Error::DimensionMismatch { expected: self.num_dimensions(), found: point.len() });
        }
        if !self.grid.contains(point) {
            match options.out_of_bounds {
                OutOfBounds::Error => return Err(Error::OutOfDomain(point.to_vec())),
                OutOfBounds::Fill(value) => return Ok(value),
                OutOfBounds::Extrapolate => {}
            }
        }
        Ok(match options.method {
            Method::Nearest => interp::nearest(&self.grid, &self.data, point),
            Method::Linear => interp::multilinear(&self.grid, &self.data, point),
            Method::Spline => self.spline().evaluate(point),
        })
    }


    /**
     * Evaluate the field with the cached spline at each of many points.
     */
    pub fn evaluate_points(&self, points: &[Vec<f64>]) -> Result<Vec<f64>> {
        points.par_iter().map(|p| self.evaluate(p)).collect()
    }


    /**
     * Return this field interpolated onto every cell of `new_grid`. This
     * costs one interpolation per target cell and is never done implicitly.
     */
    pub fn resampled(&self, new_grid: &UniformGrid, options: ResampleOptions) -> Result<Self> {
        if new_grid.num_dimensions() != self.num_dimensions() {
            return Err(Error::DimensionMismatch { expected: self.num_dimensions(), found: new_grid.num_dimensions() });
        }
        debug!("resampling {:?} onto {:?} with {:?}", self.shape(), new_grid.shape(), options.method);

        if options.method == Method::Spline {
            self.spline();
        }
        let coordinates = new_grid.coordinates_same_shape();
        let data = (0..new_grid.num_cells())
            .into_par_iter()
            .map(|n| {
                let point: Vec<_> = coordinates.iter().map(|c| c[n]).collect();
                self.evaluate_with(&point, options)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(new_grid.clone(), data)
    }


    pub fn min(&self) -> f64 {
        self.data.par_iter().copied().reduce(|| f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.data.par_iter().copied().reduce(|| f64::NEG_INFINITY, f64::max)
    }

    pub fn abs_min(&self) -> f64 {
        self.data.par_iter().map(|x| x.abs()).reduce(|| f64::INFINITY, f64::min)
    }

    pub fn abs_max(&self) -> f64 {
        self.data.par_iter().map(|x| x.abs()).reduce(|| f64::NEG_INFINITY, f64::max)
    }


    pub fn mean(&self) -> f64 {
        self.data.par_iter().sum::<f64>() / self.data.len() as f64
    }


    /**
     * Return the sum of the values times the cell volume.
     */
    pub fn integral(&self) -> f64 {
        self.data.par_iter().sum::<f64>() * self.dv()
    }


    pub fn norm1(&self) -> f64 {
        self.data.par_iter().map(|x| x.abs()).sum::<f64>() * self.dv()
    }


    /**
     * Return the L2 norm with respect to the grid measure,
     * `sqrt(sum(v^2) dv)`.
     */
    pub fn norm2(&self) -> f64 {
        (self.data.par_iter().map(|x| x * x).sum::<f64>() * self.dv()).sqrt()
    }


    pub fn norm_p(&self, p: f64) -> Result<f64> {
        if !(p > 0.0) {
            return Err(Error::InvalidArgument(format!("norm order must be positive, got {}", p)));
        }
        Ok((self.data.par_iter().map(|x| x.abs().powf(p)).sum::<f64>() * self.dv()).powf(1.0 / p))
    }


    /**
     * Count the values in `num_bins` equal bins spanning `range` (the data
     * extent by default). Returns the `num_bins + 1` bin edges and the
     * counts. Bins are half-open except the last, which includes its right
     * edge; values outside the range and NaNs are not counted.
     */
    pub fn histogram(&self, num_bins: usize, range: Option<(f64, f64)>) -> Result<(Vec<f64>, Vec<usize>)> {
        if num_bins == 0 {
            return Err(Error::InvalidArgument("histogram needs at least one bin".into()));
        }
        let (mut lo, mut hi) = range.unwrap_or_else(|| (self.min(), self.max()));

        if !(lo.is_finite() && hi.is_finite()) || lo > hi {
            return Err(Error::InvalidArgument(format!("invalid histogram range ({}, {})", lo, hi)));
        }
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }
        let width = (hi - lo) / num_bins as f64;
        let edges: Vec<_> = (0..=num_bins).map(|k| lo + k as f64 * width).collect();
        let mut counts = vec![0; num_bins];

        for &x in self.data.iter().filter(|x| (lo..=hi).contains(*x)) {
            let bin = (((x - lo) / width) as usize).min(num_bins - 1);
            counts[bin] += 1;
        }
        Ok((edges, counts))
    }


    /**
     * Cut the field along some axes. Each entry of `cut` is either `None`,
     * keeping the axis, or `Some(x)`, fixing the axis to the cell nearest to
     * `x`. At least one axis must be kept.
     */
    pub fn sliced(&self, cut: &[Option<f64>]) -> Result<Self> {
        if cut.len() != self.num_dimensions() {
            return Err(Error::DimensionMismatch { expected: self.num_dimensions(), found: cut.len() });
        }
        let lowest = self.grid.lowest_vertex();
        let highest = self.grid.highest_vertex();

        for (axis, x) in cut.iter().enumerate() {
            if let Some(x) = x {
                if !(lowest[axis]..=highest[axis]).contains(x) {
                    let mut point = self.x0().to_vec();
                    point[axis] = *x;
                    return Err(Error::OutOfDomain(point));
                }
            }
        }
        let keep: Vec<_> = cut.iter().map(|c| c.is_none()).collect();
        let new_grid = self.grid.with_axes_kept(&keep)?;
        let fixed: Vec<_> = cut
            .iter()
            .enumerate()
            .map(|(axis, c)| c.map(|x| {
                let mut point = self.x0().to_vec();
                point[axis] = x;
                self.grid.nearest_index(&point)[axis]
            }))
            .collect();

        let data = (0..new_grid.num_cells())
            .map(|n| {
                let mut reduced = unravel_index(n, new_grid.shape()).into_iter();
                let index: Vec<_> = fixed
                    .iter()
                    .map(|f| f.unwrap_or_else(|| reduced.next().unwrap_or(0)))
                    .collect();
                self.data[ravel_index(&index, self.shape())]
            })
            .collect();

        Self::new(new_grid, data)
    }


    /**
     * Return the field restricted to the interior of its grid.
     */
    pub fn ghost_zones_removed(&self) -> Self {
        if self.grid.num_ghost().iter().all(|&g| g == 0) {
            return self.clone();
        }
        let new_grid = self.grid.ghost_zones_removed();
        let ghost: Vec<_> = self.grid.num_ghost().iter().map(|&g| g as i64).collect();
        let parent = IndexSpace::from_shape(self.shape());
        let interior = IndexSpace::from_start_and_shape(&ghost, new_grid.shape());
        let data = interior
            .iter()
            .map(|index| self.data[parent.row_major_offset(&index)])
            .collect();

        Self { grid: new_grid, data, spline: OnceCell::new() }
    }


    /**
     * Return the field with the single-cell axes dropped.
     */
    pub fn flat_dimensions_removed(&self) -> Result<Self> {
        let grid = self.grid.flat_dimensions_removed()?;
        Self::new(grid, self.data.clone())
    }


    /**
     * Return the derivative along one axis: second-order central
     * differences in the interior and second-order one-sided differences at
     * the edges. An axis with a single cell has zero derivative.
     */
    pub fn partial_derivative(&self, axis: usize) -> Result<Self> {
        if axis >= self.num_dimensions() {
            return Err(Error::InvalidArgument(format!(
                "axis {} out of range for {} dimensions", axis, self.num_dimensions())));
        }
        let n = self.shape()[axis];
        let h = self.dx()[axis];
        let stride = strides(self.shape())[axis];
        let f = &self.data;

        let data = (0..f.len())
            .into_par_iter()
            .map(|m| {
                let k = (m / stride) % n;
                match n {
                    1 => 0.0,
                    2 => (f[m + (1 - k) * stride] - f[m - k * stride]) / h,
                    _ if k == 0 => (-3.0 * f[m] + 4.0 * f[m + stride] - f[m + 2 * stride]) / (2.0 * h),
                    _ if k == n - 1 => (3.0 * f[m] - 4.0 * f[m - stride] + f[m - 2 * stride]) / (2.0 * h),
                    _ => (f[m + stride] - f[m - stride]) / (2.0 * h),
                }
            })
            .collect();

        Self::new(self.grid.clone(), data)
    }


    /**
     * Return the partial derivatives along every axis.
     */
    pub fn gradient(&self) -> Result<Vec<Self>> {
        (0..self.num_dimensions()).map(|axis| self.partial_derivative(axis)).collect()
    }


    /**
     * Encode the field (grid and data) as CBOR bytes.
     */
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes).map_err(|e| Error::Encoding(e.to_string()))?;
        Ok(bytes)
    }


    /**
     * Decode a field from CBOR bytes written by `to_cbor`. The grid goes
     * through the same checks as `UniformGrid::from_spacing` and
     * `with_num_ghost`, and the data length is checked as in `new`; any
     * failure is an `Encoding` error.
     */
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let decoded: Self = ciborium::de::from_reader(bytes).map_err(|e| Error::Encoding(e.to_string()))?;
        Self::new(decoded.grid, decoded.data)
    }
}




// ============================================================================
impl NumericField for UniformGridData {
    fn apply_unary<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync
    {
        Self {
            grid: self.grid.clone(),
            data: self.data.par_iter().map(|&x| f(x)).collect(),
            spline: OnceCell::new(),
        }
    }

    fn apply_binary<F>(&self, other: &Self, f: F) -> Result<Self>
    where
        F: Fn(f64, f64) -> f64 + Send + Sync
    {
        self.grid.check_same_lattice(&other.grid)?;

        Ok(Self {
            grid: self.grid.clone(),
            data: self.data.par_iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect(),
            spline: OnceCell::new(),
        })
    }
}

impl_field_ops!(UniformGridData);

impl PartialEq for UniformGridData {
    fn eq(&self, other: &Self) -> bool {
        self.grid == other.grid && self.data == other.data
    }
}

impl fmt::Display for UniformGridData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.grid)?;
        write!(f, "Data range       = [{}, {}]", self.min(), self.max())
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use serde::Serialize;
    use super::UniformGridData;
    use crate::error::Error;
    use crate::grid::UniformGrid;
    use crate::interp::{Method, OutOfBounds, ResampleOptions};
    use crate::numeric::NumericField;

    fn x_plus_y() -> UniformGridData {
        UniformGridData::sample_function(|x| x[0] + x[1], &[5, 5], &[0.0, 0.0], &[4.0, 4.0], -1).unwrap()
    }

    #[test]
    fn data_must_match_the_grid() {
        let grid = UniformGrid::from_corners(&[3, 2], &[0.0, 0.0], &[1.0, 1.0]).unwrap();
        assert_eq!(
            UniformGridData::new(grid.clone(), vec![0.0; 5]),
            Err(Error::ShapeMismatch { expected: 6, found: 5 }));
        assert!(UniformGridData::new(grid, vec![0.0; 6]).is_ok());
    }

    #[test]
    fn sampled_values_match_the_function() {
        let field = x_plus_y();
        assert_eq!(field.value_at_index(&[1, 3]).unwrap(), 4.0);
        assert_eq!(field.value_at_index(&[4, 4]).unwrap(), 8.0);
        assert!(field.value_at_index(&[5, 0]).is_err());
    }

    #[test]
    fn reductions_use_the_cell_volume() {
        let field = x_plus_y();
        assert!((field.mean() - 4.0).abs() < 1e-12);
        assert!((field.integral() - 100.0).abs() < 1e-12);
        assert_eq!(field.min(), 0.0);
        assert_eq!(field.max(), 8.0);

        let half = UniformGridData::sample_function(|_| 2.0, &[3], &[0.0], &[1.0], -1).unwrap();
        assert!((half.integral() - 3.0).abs() < 1e-12);
        assert!((half.norm2() - (4.0 * 3.0 * 0.5_f64).sqrt()).abs() < 1e-12);
        assert!((half.norm_p(2.0).unwrap() - half.norm2()).abs() < 1e-12);
        assert!(half.norm_p(0.0).is_err());
    }

    #[test]
    fn histogram_counts_every_value() {
        let field = x_plus_y();
        let (edges, counts) = field.histogram(4, None).unwrap();
        assert_eq!(edges, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(counts.iter().sum::<usize>(), 25);
        assert_eq!(counts, vec![3, 7, 9, 6]);
        assert!(field.histogram(0, None).is_err());
    }

    #[test]
    fn slicing_fixes_axes() {
        let field = x_plus_y();
        let cut = field.sliced(&[None, Some(2.0)]).unwrap();
        assert_eq!(cut.shape(), &[5]);
        assert_eq!(cut.data(), &[2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(cut.grid().coordinates_1d()[0], vec![0.0, 1.0, 2.0, 3.0, 4.0]);

        let cut = field.sliced(&[Some(0.9), None]).unwrap();
        assert_eq!(cut.data(), &[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert!(matches!(field.sliced(&[Some(1.0), Some(1.0)]), Err(Error::InvalidArgument(_))));
        assert!(matches!(field.sliced(&[None]), Err(Error::DimensionMismatch { .. })));
        assert!(matches!(field.sliced(&[None, Some(10.0)]), Err(Error::OutOfDomain(_))));
    }

    #[test]
    fn transposed_view_reverses_axes() {
        let field = UniformGridData::sample_function(|x| 10.0 * x[0] + x[1], &[3, 2], &[0.0, 0.0], &[2.0, 1.0], -1).unwrap();
        assert_eq!(field.data(), &[0.0, 1.0, 10.0, 11.0, 20.0, 21.0]);
        assert_eq!(field.shape_xyz(), vec![2, 3]);
        assert_eq!(field.data_xyz(), vec![0.0, 10.0, 20.0, 1.0, 11.0, 21.0]);
    }

    #[test]
    fn evaluation_interpolates_and_rejects_outside_points() {
        let field = x_plus_y();
        assert!((field.evaluate(&[1.5, 2.25]).unwrap() - 3.75).abs() < 1e-10);
        assert!(matches!(field.evaluate(&[10.0, 0.0]), Err(Error::OutOfDomain(_))));
        assert!(matches!(field.evaluate(&[1.0]), Err(Error::DimensionMismatch { .. })));

        let fill = ResampleOptions::new(Method::Linear, OutOfBounds::Fill(-1.0));
        assert_eq!(field.evaluate_with(&[10.0, 0.0], fill).unwrap(), -1.0);

        let extrapolate = ResampleOptions::new(Method::Linear, OutOfBounds::Extrapolate);
        assert!((field.evaluate_with(&[6.0, 0.0], extrapolate).unwrap() - 6.0).abs() < 1e-12);

        let nearest = ResampleOptions::new(Method::Nearest, OutOfBounds::Error);
        assert_eq!(field.evaluate_with(&[1.4, 2.6], nearest).unwrap(), 4.0);

        let values = field.evaluate_points(&[vec![0.5, 0.5], vec![3.0, 1.0]]).unwrap();
        assert!((values[0] - 1.0).abs() < 1e-10);
        assert!((values[1] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn resampling_onto_the_same_grid_is_identity() {
        let field = UniformGridData::sample_function(|x| (x[0] * x[1]).sin(), &[9, 7], &[0.0, 0.0], &[2.0, 1.5], -1).unwrap();

        for method in [Method::Nearest, Method::Linear, Method::Spline] {
            let options = ResampleOptions::new(method, OutOfBounds::Error);
            let same = field.resampled(field.grid(), options).unwrap();
            for (a, b) in same.data().iter().zip(field.data()) {
                assert!((a - b).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn resampling_onto_a_finer_grid() {
        let field = x_plus_y();
        let fine = UniformGrid::from_corners(&[9, 9], &[0.0, 0.0], &[4.0, 4.0]).unwrap();
        let resampled = field.resampled(&fine, ResampleOptions::default()).unwrap();
        assert_eq!(resampled.grid(), &fine);
        assert!((resampled.value_at_index(&[1, 1]).unwrap() - 1.0).abs() < 1e-12);

        let wider = UniformGrid::from_corners(&[3, 3], &[-2.0, 0.0], &[2.0, 4.0]).unwrap();
        assert!(field.resampled(&wider, ResampleOptions::default()).is_err());
        let filled = field
            .resampled(&wider, ResampleOptions::default().with_out_of_bounds(OutOfBounds::Fill(0.0)))
            .unwrap();
        assert_eq!(filled.value_at_index(&[0, 2]).unwrap(), 0.0);
    }

    #[test]
    fn arithmetic_is_elementwise() {
        let a = x_plus_y();
        let b = a.sin();
        let c = (&a + &b).unwrap();
        for ((x, y), z) in a.data().iter().zip(b.data()).zip(c.data()) {
            assert_eq!(x + y, *z);
        }
        let d = &a * 2.0 - 1.0;
        assert_eq!(d.value_at_index(&[1, 1]).unwrap(), 3.0);
        assert_eq!((-&a).value_at_index(&[2, 0]).unwrap(), -2.0);
        assert_eq!(a.abs().sqrt().value_at_index(&[2, 2]).unwrap(), 2.0);
    }

    #[test]
    fn arithmetic_on_different_grids_fails() {
        let a = x_plus_y();
        let b = UniformGridData::sample_function(|x| x[0], &[5, 5], &[0.0, 0.0], &[4.0, 5.0], -1).unwrap();
        assert!(matches!(&a + &b, Err(Error::GridMismatch(_))));
        assert!(matches!(a.pow(&b), Err(Error::GridMismatch(_))));

        let later = UniformGridData::new(a.grid().clone().with_time(3.0), a.data().to_vec()).unwrap();
        assert!((&a - &later).is_ok());
    }

    #[test]
    fn derivatives_are_exact_for_quadratics() {
        let field = UniformGridData::sample_function(|x| x[0] * x[0] + 3.0 * x[1], &[6, 4], &[0.0, 0.0], &[1.0, 1.0], -1).unwrap();
        let gradient = field.gradient().unwrap();
        let expected = UniformGridData::from_function(field.grid().clone(), |x| 2.0 * x[0]);

        for (a, b) in gradient[0].data().iter().zip(expected.data()) {
            assert!((a - b).abs() < 1e-10);
        }
        for a in gradient[1].data() {
            assert!((a - 3.0).abs() < 1e-10);
        }
        assert!(field.partial_derivative(2).is_err());
    }

    #[test]
    fn ghost_zones_are_stripped() {
        let grid = UniformGrid::from_spacing(&[6, 5], &[0.0, 0.0], &[1.0, 1.0])
            .unwrap()
            .with_num_ghost(&[1, 2])
            .unwrap();
        let field = UniformGridData::from_function(grid, |x| x[0] + 10.0 * x[1]);
        let inner = field.ghost_zones_removed();
        assert_eq!(inner.shape(), &[4, 1]);
        assert_eq!(inner.data(), &[21.0, 22.0, 23.0, 24.0]);
        assert_eq!(inner.flat_dimensions_removed().unwrap().shape(), &[4]);
    }

    #[test]
    fn cbor_encoding_preserves_the_field() {
        let field = x_plus_y();
        let decoded = UniformGridData::from_cbor(&field.to_cbor().unwrap()).unwrap();
        assert_eq!(decoded, field);
        assert!(matches!(UniformGridData::from_cbor(&[0xff, 0x00]), Err(Error::Encoding(_))));
    }

    #[derive(Serialize)]
    struct Encoded {
        grid: EncodedGrid,
        data: Vec<f64>,
    }

    #[derive(Serialize)]
    struct EncodedGrid {
        shape: Vec<usize>,
        x0: Vec<f64>,
        dx: Vec<f64>,
        ref_level: i32,
        time: Option<f64>,
        iteration: Option<u64>,
        num_ghost: Vec<usize>,
    }

    fn encoded(shape: Vec<usize>, dx: Vec<f64>, num_ghost: Vec<usize>, data: Vec<f64>) -> Vec<u8> {
        let x0 = vec![0.0; shape.len()];
        let field = Encoded {
            grid: EncodedGrid { shape, x0, dx, ref_level: 0, time: None, iteration: None, num_ghost },
            data,
        };
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&field, &mut bytes).unwrap();
        bytes
    }

    #[test]
    fn cbor_decoding_rejects_invalid_grids() {
        let valid = encoded(vec![3], vec![1.0], vec![0], vec![1.0, 2.0, 3.0]);
        assert_eq!(UniformGridData::from_cbor(&valid).unwrap().integral(), 6.0);

        let negative_spacing = encoded(vec![3], vec![-1.0], vec![0], vec![1.0, 2.0, 3.0]);
        let empty_axis = encoded(vec![0], vec![1.0], vec![0], vec![]);
        let no_interior = encoded(vec![2], vec![1.0], vec![1], vec![1.0, 2.0]);
        let short_data = encoded(vec![3], vec![1.0], vec![0], vec![1.0]);

        for bytes in [negative_spacing, empty_axis, no_interior] {
            assert!(matches!(UniformGridData::from_cbor(&bytes), Err(Error::Encoding(_))));
        }
        assert!(matches!(UniformGridData::from_cbor(&short_data), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn vector_fields_are_sampled_and_combined() {
        let grid = UniformGrid::from_corners(&[4, 3], &[0.0, 0.0], &[3.0, 2.0]).unwrap();
        let [vx, vy] = UniformGridData::from_function_n(grid.clone(), |x| [3.0 * x[0], 4.0 * x[0]]);
        assert_eq!(vx, UniformGridData::from_function(grid.clone(), |x| 3.0 * x[0]));
        assert_eq!(vy.value_at_index(&[2, 1]).unwrap(), 8.0);

        let speed = UniformGridData::combine(&[vx.clone(), vy.clone()], |[a, b]| a.hypot(b)).unwrap();
        assert!((speed.value_at_index(&[2, 1]).unwrap() - 10.0).abs() < 1e-12);
        assert_eq!(speed.grid(), &grid);

        let shifted = UniformGridData::sample_function(|_| 0.0, &[4, 3], &[0.5, 0.0], &[3.5, 2.0], -1).unwrap();
        assert!(matches!(
            UniformGridData::combine(&[vx, shifted], |[a, b]| a + b),
            Err(Error::GridMismatch(_))));
        assert!(matches!(
            UniformGridData::combine::<_, 0>(&[], |_| 0.0),
            Err(Error::InvalidArgument(_))));
    }
}
