use num_complex::Complex64;

use crate::fractal::FractalMode;

/// Nombre d'itérations avant échappement pour un point du plan.
///
/// Itère `z' = z² + c` jusqu'à `|z|² > bailout_sq` ou `max_iter`.
/// Le résultat est toujours dans `[0, max_iter]` ; `max_iter` signifie
/// que le point est considéré dans l'ensemble.
pub fn escape_count(mode: FractalMode, point: Complex64, max_iter: u32, bailout_sq: f64) -> u32 {
    match mode {
        FractalMode::Mandelbrot => mandelbrot(point, max_iter, bailout_sq),
        FractalMode::Julia { c } => julia(point, c, max_iter, bailout_sq),
    }
}

/// Graine z = 0, c = point. Test après chaque mise à jour : le compte
/// renvoyé est l'indice de la mise à jour qui s'échappe.
fn mandelbrot(c: Complex64, max_iter: u32, bailout_sq: f64) -> u32 {
    let (mut zx, mut zy) = (0.0f64, 0.0f64);
    let mut iter = 0;
    while iter < max_iter {
        let tmp = zx * zx - zy * zy + c.re;
        zy = 2.0 * zx * zy + c.im;
        zx = tmp;
        if zx * zx + zy * zy > bailout_sq {
            break;
        }
        iter += 1;
    }
    iter
}

/// z initial = point, c fixe. Test avant chaque mise à jour : le compte
/// renvoyé est le nombre de mises à jour effectuées.
fn julia(z0: Complex64, c: Complex64, max_iter: u32, bailout_sq: f64) -> u32 {
    let (mut zx, mut zy) = (z0.re, z0.im);
    let mut iter = 0;
    while iter < max_iter && zx * zx + zy * zy <= bailout_sq {
        let tmp = zx * zx - zy * zy + c.re;
        zy = 2.0 * zx * zy + c.im;
        zx = tmp;
        iter += 1;
    }
    iter
}
