use crate::fractal::FractalMode;

/// Palettes disponibles, une par famille de fractale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Palette {
    /// Polynômes de Bernstein sur t = iter / max_iter, intérieur noir.
    Polynomial,
    /// Niveaux de gris proportionnels à iter / max_iter, intérieur blanc.
    Grayscale,
}

impl Palette {
    pub fn for_mode(mode: FractalMode) -> Self {
        match mode {
            FractalMode::Mandelbrot => Palette::Polynomial,
            FractalMode::Julia { .. } => Palette::Grayscale,
        }
    }

    pub fn color(self, iteration: u32, iter_max: u32) -> (u8, u8, u8) {
        match self {
            Palette::Polynomial => polynomial(iteration, iter_max),
            Palette::Grayscale => grayscale(iteration, iter_max),
        }
    }
}

/// Couleur RGB d'un compte d'itérations. Fonction pure de ses entrées.
///
/// Pour `iteration == iter_max` Mandelbrot donne du noir et Julia du blanc :
/// cette asymétrie est conservée telle quelle.
pub fn color_for_iteration(iteration: u32, iter_max: u32, mode: FractalMode) -> (u8, u8, u8) {
    Palette::for_mode(mode).color(iteration, iter_max)
}

fn polynomial(iteration: u32, iter_max: u32) -> (u8, u8, u8) {
    if iteration >= iter_max {
        return (0, 0, 0);
    }
    let t = iteration as f64 / iter_max as f64;
    // Troncature puis masque 8 bits, comme le kernel GPU.
    let r = (9.0 * (1.0 - t) * t * t * t * 255.0) as i32;
    let g = (15.0 * (1.0 - t) * (1.0 - t) * t * t * 255.0) as i32;
    let b = (8.5 * (1.0 - t) * (1.0 - t) * (1.0 - t) * t * 255.0) as i32;
    ((r & 0xFF) as u8, (g & 0xFF) as u8, (b & 0xFF) as u8)
}

fn grayscale(iteration: u32, iter_max: u32) -> (u8, u8, u8) {
    let v = (255.0 * iteration as f64 / iter_max as f64) as u8;
    (v, v, v)
}
