use thiserror::Error;




/**
 * Error to represent invalid grid geometry, incompatible operands, or
 * requests for data that is not there.
 */
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("data has {found} elements but the grid has {expected} cells")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("expected {expected} dimensions, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("grids are not compatible: {0}")]
    GridMismatch(String),

    #[error("index {index:?} out of bounds for shape {shape:?}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },

    #[error("refinement level {0} has multiple components, use `level` to access them")]
    AmbiguousComponents(u32),

    #[error("refinement level {0} is not available")]
    LevelNotFound(u32),

    #[error("no data at point {0:?}")]
    OutOfDomain(Vec<f64>),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}




pub type Result<T> = std::result::Result<T, Error>;
