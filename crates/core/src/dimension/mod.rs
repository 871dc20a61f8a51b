//! Auxiliary reporting dimensions.

pub mod types;

pub use types::{Dimension, DimensionRefs, DimensionType, DIMENSION_NONE};
