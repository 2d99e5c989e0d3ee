//! Interpolation of cell-centered data on a uniform lattice: nearest cell,
//! multilinear, and a tensor-product cubic B-spline.
//!
//! The spline is interpolating: the data are prefiltered along every axis
//! (one tridiagonal solve per grid line) so that the spline passes through
//! every sample. Virtual coefficients beyond the grid are continued linearly,
//! which makes linear fields exact and extrapolation well defined.

use log::debug;
use serde::{Deserialize, Serialize};
use crate::grid::UniformGrid;
use crate::index_space::strides;




/**
 * The interpolation scheme used to evaluate data away from cell centers.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Nearest,
    Linear,
    Spline,
}




/**
 * What to do with points that lie outside the grid (including its half-cell
 * margin).
 */
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum OutOfBounds {
    /// Continue the boundary polynomial; nearest-cell evaluation clamps.
    Extrapolate,
    /// Use a constant value.
    Fill(f64),
    /// Fail with `Error::OutOfDomain`.
    Error,
}




/**
 * Options for `resampled` and point evaluation.
 */
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResampleOptions {
    pub method: Method,
    pub out_of_bounds: OutOfBounds,
}




// ============================================================================
impl Default for ResampleOptions {
    fn default() -> Self {
        Self {
            method: Method::Linear,
            out_of_bounds: OutOfBounds::Error,
        }
    }
}

impl ResampleOptions {
    pub fn new(method: Method, out_of_bounds: OutOfBounds) -> Self {
        Self { method, out_of_bounds }
    }

    pub fn with_method(self, method: Method) -> Self {
        Self { method, ..self }
    }

    pub fn with_out_of_bounds(self, out_of_bounds: OutOfBounds) -> Self {
        Self { out_of_bounds, ..self }
    }
}




/**
 * Return the value of the cell nearest to `point`. Points outside the grid
 * take the value of the closest boundary cell.
 */
pub fn nearest(grid: &UniformGrid, data: &[f64], point: &[f64]) -> f64 {
    let index = grid.nearest_index(point);
    let offset = index
        .iter()
        .zip(strides(grid.shape()))
        .map(|(i, s)| i * s)
        .sum::<usize>();
    data[offset]
}




/**
 * Multilinear interpolation of `data` at `point`. Outside the grid the
 * boundary cell's linear polynomial is continued. Axes with a single cell
 * are constant.
 */
pub fn multilinear(grid: &UniformGrid, data: &[f64], point: &[f64]) -> f64 {
    let shape = grid.shape();
    let strides = strides(shape);
    let stencil: Vec<_> = grid
        .fractional_index(point)
        .iter()
        .zip(shape)
        .zip(&strides)
        .map(|((&f, &n), &s)| {
            if n == 1 {
                vec![(0, 1.0)]
            } else {
                let i = f.floor().clamp(0.0, (n - 2) as f64);
                let t = f - i;
                let i = i as usize;
                vec![(i * s, 1.0 - t), ((i + 1) * s, t)]
            }
        })
        .collect();

    tensor_sum(&stencil, data)
}




/**
 * Sum `data[offset] * weight` over the tensor product of per-axis
 * `(offset, weight)` lists.
 */
fn tensor_sum(stencil: &[Vec<(usize, f64)>], data: &[f64]) -> f64 {
    let mut total = 0.0;
    let mut cursor = vec![0; stencil.len()];

    loop {
        let (offset, weight) = cursor
            .iter()
            .zip(stencil)
            .fold((0, 1.0), |(o, w), (&c, axis)| (o + axis[c].0, w * axis[c].1));

        total += weight * data[offset];

        let mut axis = stencil.len();
        loop {
            if axis == 0 {
                return total;
            }
            axis -= 1;
            cursor[axis] += 1;
            if cursor[axis] < stencil[axis].len() {
                break;
            }
            cursor[axis] = 0;
        }
    }
}




/**
 * Solve the tridiagonal system `Ax = d` with the Thomas algorithm, where `a`
 * is the sub-diagonal (`a[0]` unused), `b` the diagonal, and `c` the
 * super-diagonal (`c[n-1]` unused). The system must be diagonally dominant.
 */
pub fn thomas_solve(a: &[f64], b: &[f64], c: &[f64], d: &[f64]) -> Vec<f64> {
    let n = d.len();
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    if n == 0 {
        return Vec::new();
    }
    c_prime[0] = c[0] / b[0];
    d_prime[0] = d[0] / b[0];

    for i in 1..n {
        let den = b[i] - a[i] * c_prime[i - 1];
        if i < n - 1 {
            c_prime[i] = c[i] / den;
        }
        d_prime[i] = (d[i] - a[i] * d_prime[i - 1]) / den;
    }

    let mut x = vec![0.0; n];
    x[n - 1] = d_prime[n - 1];

    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - c_prime[i] * x[i + 1];
    }
    x
}




/**
 * Return the B-spline coefficients interpolating the samples `f` along one
 * grid line. The end coefficients equal the end samples.
 */
fn prefilter_line(f: &[f64]) -> Vec<f64> {
    let n = f.len();

    if n <= 2 {
        return f.to_vec();
    }
    let mut a = vec![1.0 / 6.0; n];
    let mut b = vec![4.0 / 6.0; n];
    let mut c = vec![1.0 / 6.0; n];
    a[0] = 0.0;
    c[0] = 0.0;
    b[0] = 1.0;
    a[n - 1] = 0.0;
    c[n - 1] = 0.0;
    b[n - 1] = 1.0;
    thomas_solve(&a, &b, &c, f)
}




/**
 * Weights of the four cubic B-splines overlapping the segment `[i, i+1]`, at
 * local coordinate `t`, for the coefficients `i-1, i, i+1, i+2`.
 */
fn bspline_weights(t: f64) -> [f64; 4] {
    let s = 1.0 - t;
    [
        s * s * s / 6.0,
        (3.0 * t * t * t - 6.0 * t * t + 4.0) / 6.0,
        (-3.0 * t * t * t + 3.0 * t * t + 3.0 * t + 1.0) / 6.0,
        t * t * t / 6.0,
    ]
}




/**
 * A tensor-product cubic B-spline through cell-centered samples. Building
 * it costs one tridiagonal solve per grid line; evaluation costs `4^N`
 * multiply-adds.
 */
#[derive(Clone, Debug)]
pub struct SplineInterpolant {
    grid: UniformGrid,
    coefficients: Vec<f64>,
}




// ============================================================================
impl SplineInterpolant {

    pub fn new(grid: &UniformGrid, data: &[f64]) -> Self {
        debug!("building spline interpolant over {} cells", data.len());

        let shape = grid.shape();
        let strides = strides(shape);
        let mut coefficients = data.to_vec();

        for axis in 0..shape.len() {
            let n = shape[axis];
            if n <= 2 {
                continue;
            }
            let stride = strides[axis];
            let outer = data.len() / (n * stride);

            for o in 0..outer {
                for inner in 0..stride {
                    let base = o * n * stride + inner;
                    let line: Vec<_> = (0..n).map(|k| coefficients[base + k * stride]).collect();

                    for (k, value) in prefilter_line(&line).into_iter().enumerate() {
                        coefficients[base + k * stride] = value;
                    }
                }
            }
        }
        Self { grid: grid.clone(), coefficients }
    }


    pub fn grid(&self) -> &UniformGrid {
        &self.grid
    }


    /**
     * Evaluate the spline at `point`. Outside the grid the boundary
     * segment's cubic is continued.
     */
    pub fn evaluate(&self, point: &[f64]) -> f64 {
        let shape = self.grid.shape();
        let strides = strides(shape);
        let stencil: Vec<_> = self.grid
            .fractional_index(point)
            .iter()
            .zip(shape)
            .zip(&strides)
            .map(|((&f, &n), &s)| axis_stencil(f, n, s))
            .collect();

        tensor_sum(&stencil, &self.coefficients)
    }
}




/**
 * Per-axis `(offset, weight)` list for the spline. Coefficients at `-1` and
 * `n` are linear continuations, folded onto the two nearest real ones.
 */
fn axis_stencil(f: f64, n: usize, stride: usize) -> Vec<(usize, f64)> {
    if n == 1 {
        return vec![(0, 1.0)];
    }
    let i = f.floor().clamp(0.0, (n - 2) as f64);
    let weights = bspline_weights(f - i);
    let i = i as i64;
    let last = n as i64 - 1;
    let mut stencil = Vec::with_capacity(6);

    for (k, w) in weights.iter().enumerate() {
        let j = i - 1 + k as i64;
        if j < 0 {
            stencil.push((0, 2.0 * w));
            stencil.push((stride, -w));
        } else if j > last {
            stencil.push((last as usize * stride, 2.0 * w));
            stencil.push(((last - 1) as usize * stride, -w));
        } else {
            stencil.push((j as usize * stride, *w));
        }
    }
    stencil
}
