pub mod png;

pub use png::{save_png, save_png_ok};
