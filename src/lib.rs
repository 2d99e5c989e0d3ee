//! Gridfield represents scalar fields sampled on uniform Cartesian grids, and
//! on mesh-refined hierarchies of such grids as written by Berger-Oliger AMR
//! simulation codes. A `UniformGrid` describes a lattice of cell centers; a
//! `UniformGridData` holds one value per cell and supports elementwise math,
//! interpolation, resampling, slicing, reductions and derivatives. A
//! `HierarchicalGridData` groups many components by refinement level,
//! merges components that tile a rectangle, and can be flattened onto a
//! single grid at the finest resolution.

pub mod error;
pub mod grid;
pub mod grid_data;
pub mod hierarchical;
pub mod index_space;
pub mod interp;
pub mod numeric;

pub use error::{Error, Result};
pub use grid::{Coordinates, UniformGrid, NO_REFINEMENT};
pub use grid_data::UniformGridData;
pub use hierarchical::{HierarchicalGridData, LevelData};
pub use interp::{Method, OutOfBounds, ResampleOptions};
pub use numeric::NumericField;
