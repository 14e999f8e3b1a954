use num_complex::Complex64;

use crate::error::{EngineError, EngineResult};

/// Constante de Julia utilisée par défaut (c = 0.285 + 0.01i).
pub const DEFAULT_JULIA_C: Complex64 = Complex64::new(0.285, 0.01);

/// Bornes du viewport dans le plan complexe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Rectangle du plan complexe projeté sur l'image.
///
/// Les bornes sont toujours symétriques autour du centre ; la hauteur
/// dans le plan vaut `scale / aspect_ratio`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub center_x: f64,
    pub center_y: f64,
    /// Largeur du viewport en unités du plan.
    pub scale: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32, center_x: f64, center_y: f64, scale: f64) -> EngineResult<Self> {
        let buffer_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(3));
        if width == 0 || height == 0 || buffer_len.is_none() {
            return Err(EngineError::InvalidDimensions { width, height });
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(EngineError::InvalidScale(scale));
        }
        Ok(Self {
            width,
            height,
            center_x,
            center_y,
            scale,
        })
    }

    /// Division réelle : une division entière tronquerait le ratio.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Étendue verticale dans le plan.
    pub fn span_y(&self) -> f64 {
        self.scale / self.aspect_ratio()
    }

    pub fn bounds(&self) -> Bounds {
        let span_y = self.span_y();
        Bounds {
            x_min: self.center_x - self.scale / 2.0,
            x_max: self.center_x + self.scale / 2.0,
            y_min: self.center_y - span_y / 2.0,
            y_max: self.center_y + span_y / 2.0,
        }
    }

    /// Taille attendue du buffer RGB (`width * height * 3`), sans débordement
    /// pour tout viewport accepté par [`Viewport::new`].
    pub fn buffer_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Nombre d'octets d'une ligne de pixels.
    pub fn row_stride(&self) -> usize {
        self.width as usize * 3
    }

    /// Projette un pixel sur le plan : interpolation linéaire de
    /// `[0, width)` vers `[x_min, x_max)` et de `[0, height)` vers `[y_min, y_max)`.
    pub fn pixel_to_plane(&self, px: u32, py: u32) -> Complex64 {
        let bounds = self.bounds();
        Complex64::new(self.plane_x(&bounds, px), self.plane_y(&bounds, py))
    }

    /// Coordonnée réelle de la colonne `px`.
    pub fn plane_x(&self, bounds: &Bounds, px: u32) -> f64 {
        bounds.x_min + (px as f64 / self.width as f64) * (bounds.x_max - bounds.x_min)
    }

    /// Coordonnée imaginaire de la ligne `py`.
    pub fn plane_y(&self, bounds: &Bounds, py: u32) -> f64 {
        bounds.y_min + (py as f64 / self.height as f64) * (bounds.y_max - bounds.y_min)
    }
}

/// Famille de fractale, portée par tous les composants.
///
/// Mandelbrot fait varier la constante par pixel (graine z = 0) ; Julia fixe
/// la constante et fait varier le z initial.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FractalMode {
    Mandelbrot,
    Julia { c: Complex64 },
}

impl FractalMode {
    pub fn julia(c_real: f64, c_imag: f64) -> Self {
        FractalMode::Julia {
            c: Complex64::new(c_real, c_imag),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FractalMode::Mandelbrot => "Mandelbrot",
            FractalMode::Julia { .. } => "Julia",
        }
    }

    /// Point d'entrée correspondant dans le kernel GPU.
    pub fn kernel_entry_point(self) -> &'static str {
        match self {
            FractalMode::Mandelbrot => "mandelbrot_kernel",
            FractalMode::Julia { .. } => "julia_kernel",
        }
    }

    /// Constante fixe du mode Julia, zéro pour Mandelbrot.
    pub fn julia_constant(self) -> Complex64 {
        match self {
            FractalMode::Mandelbrot => Complex64::new(0.0, 0.0),
            FractalMode::Julia { c } => c,
        }
    }
}

/// Paramètres communs à tous les backends.
///
/// Le même `max_iter` est utilisé partout pour que les temps restent comparables.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FractalParams {
    pub max_iter: u32,
    pub mode: FractalMode,
}

impl FractalParams {
    pub fn new(max_iter: u32, mode: FractalMode) -> EngineResult<Self> {
        if max_iter == 0 {
            return Err(EngineError::ZeroIterations);
        }
        Ok(Self { max_iter, mode })
    }

    pub fn mandelbrot(max_iter: u32) -> EngineResult<Self> {
        Self::new(max_iter, FractalMode::Mandelbrot)
    }
}
