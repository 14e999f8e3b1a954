//! Rendu de fractales escape-time (Mandelbrot, Julia) sur trois backends
//! interchangeables : séquentiel, parallèle (rayon) et GPU (wgpu), avec
//! mesure des temps et des accélérations.
//!
//! ```no_run
//! use fractal_bench::{Backend, Engine, FractalParams, Viewport};
//!
//! let viewport = Viewport::new(800, 600, -0.5, 0.0, 4.0)?;
//! let params = FractalParams::mandelbrot(1000)?;
//! let run = Engine::default().benchmark(&viewport, &params, &Backend::ALL)?;
//! println!("{}", run.report);
//! # Ok::<(), fractal_bench::EngineError>(())
//! ```

pub mod bench;
pub mod color;
pub mod config;
pub mod error;
pub mod fractal;
pub mod gpu;
pub mod io;
pub mod render;

pub use bench::{speedup, time_backend, BackendTiming, BenchmarkReport, BenchmarkRun};
pub use color::color_for_iteration;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use fractal::{escape_count, FractalMode, FractalParams, Viewport};
pub use gpu::{render_gpu, GpuError};
pub use render::{Backend, Engine};
