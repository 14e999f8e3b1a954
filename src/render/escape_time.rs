use num_complex::Complex64;
use rayon::prelude::*;

use crate::color::color_for_iteration;
use crate::fractal::{escape_count, Bounds, FractalParams, Viewport};

/// Vérifie le contrat de taille du buffer fourni par l'appelant.
pub(crate) fn check_buffer(viewport: &Viewport, image: &[u8]) {
    assert_eq!(
        image.len(),
        viewport.buffer_len(),
        "Taille du buffer image invalide pour {}x{} RGB",
        viewport.width,
        viewport.height
    );
}

/// Remplit une ligne RGB : viewport -> itérations -> couleur.
fn render_row(
    viewport: &Viewport,
    bounds: &Bounds,
    params: &FractalParams,
    bailout_sq: f64,
    y: u32,
    row: &mut [u8],
) {
    let yg = viewport.plane_y(bounds, y);
    for (x, pixel) in row.chunks_exact_mut(3).enumerate() {
        let xg = viewport.plane_x(bounds, x as u32);
        let iteration = escape_count(params.mode, Complex64::new(xg, yg), params.max_iter, bailout_sq);
        let (r, g, b) = color_for_iteration(iteration, params.max_iter, params.mode);
        pixel[0] = r;
        pixel[1] = g;
        pixel[2] = b;
    }
}

/// Rendu mono-thread, ligne par ligne. Sert d'oracle aux autres backends.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(width = viewport.width, height = viewport.height, mode = params.mode.name())
)]
pub fn render_sequential(viewport: &Viewport, params: &FractalParams, bailout_sq: f64, image: &mut [u8]) {
    check_buffer(viewport, image);
    let bounds = viewport.bounds();
    for (y, row) in image.chunks_mut(viewport.row_stride()).enumerate() {
        render_row(viewport, &bounds, params, bailout_sq, y as u32, row);
    }
}

/// Rendu parallèle sur le pool rayon courant.
///
/// L'image est découpée en blocs de `row_chunk` lignes ; le vol de travail
/// de rayon répartit dynamiquement les blocs, les lignes intérieures
/// (coûteuses) ne bloquent pas les autres. Chaque bloc est une tranche
/// disjointe du buffer. Retourne quand tous les blocs sont terminés.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(width = viewport.width, height = viewport.height, mode = params.mode.name(), row_chunk = row_chunk)
)]
pub fn render_parallel(
    viewport: &Viewport,
    params: &FractalParams,
    bailout_sq: f64,
    row_chunk: usize,
    image: &mut [u8],
) {
    check_buffer(viewport, image);
    let bounds = viewport.bounds();
    let stride = viewport.row_stride();
    let rows_per_chunk = row_chunk.max(1);

    image
        .par_chunks_mut(stride * rows_per_chunk)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let first_row = chunk_idx * rows_per_chunk;
            for (k, row) in chunk.chunks_mut(stride).enumerate() {
                render_row(viewport, &bounds, params, bailout_sq, (first_row + k) as u32, row);
            }
        });
}
