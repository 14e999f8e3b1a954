use std::path::Path;

use image::{ImageError, RgbImage};

/// Enregistre un buffer RGB ligne par ligne (pas = `width * 3`) au format PNG.
pub fn save_png(path: &Path, image: &[u8], width: u32, height: u32) -> Result<(), ImageError> {
    assert_eq!(
        image.len(),
        width as usize * height as usize * 3,
        "Taille du buffer image invalide"
    );

    let img = RgbImage::from_raw(width, height, image.to_vec()).ok_or_else(|| {
        ImageError::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Impossible de créer l'image depuis le buffer",
        ))
    })?;

    img.save(path)
}

/// Variante booléenne de [`save_png`] ; l'erreur est journalisée.
pub fn save_png_ok(path: &Path, image: &[u8], width: u32, height: u32) -> bool {
    match save_png(path, image, width, height) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(path = %path.display(), "échec de l'écriture du PNG: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_rgb_png_with_expected_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let buffer: Vec<u8> = vec![
            255, 0, 0, 0, 255, 0, //
            0, 0, 255, 10, 20, 30,
        ];

        save_png(&path, &buffer, 2, 2).unwrap();

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(1, 0).0, [0, 255, 0]);
        assert_eq!(decoded.get_pixel(1, 1).0, [10, 20, 30]);
    }

    #[test]
    fn unwritable_path_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.png");
        assert!(!save_png_ok(&path, &[0u8; 3], 1, 1));
    }
}
