pub mod types;
pub mod iterations;

pub use types::{Bounds, FractalMode, FractalParams, Viewport, DEFAULT_JULIA_C};
pub use iterations::escape_count;
