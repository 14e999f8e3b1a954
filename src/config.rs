use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Chemin par défaut du kernel de calcul GPU, relatif au répertoire courant.
pub const DEFAULT_KERNEL_PATH: &str = "kernels/fractal.wgsl";

/// Rayon d'échappement par défaut (|z| > 2, soit |z|² > 4).
pub const DEFAULT_ESCAPE_RADIUS: f64 = 2.0;

/// Réglages du moteur partagés par les trois backends.
///
/// Tous les champs ont une valeur par défaut, un fichier JSON partiel suffit :
///
/// ```json
/// { "row_chunk": 4, "threads": 8 }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Rayon d'échappement ; l'évaluateur compare |z|² à son carré.
    pub escape_radius: f64,
    /// Source WGSL lue à chaque appel GPU.
    pub kernel_path: PathBuf,
    /// Nombre de lignes par unité de travail du backend parallèle.
    pub row_chunk: usize,
    /// Taille d'un pool rayon dédié ; `None` utilise le pool global.
    pub threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            escape_radius: DEFAULT_ESCAPE_RADIUS,
            kernel_path: PathBuf::from(DEFAULT_KERNEL_PATH),
            row_chunk: 1,
            threads: None,
        }
    }
}

impl EngineConfig {
    /// Charge un fichier JSON puis valide le résultat.
    pub fn from_json_file(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| EngineError::ConfigJson {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !self.escape_radius.is_finite() || self.escape_radius <= 0.0 {
            return Err(EngineError::config(format!(
                "escape_radius doit être fini et > 0 (reçu {})",
                self.escape_radius
            )));
        }
        if self.row_chunk == 0 {
            return Err(EngineError::config("row_chunk doit être >= 1"));
        }
        if self.threads == Some(0) {
            return Err(EngineError::config("threads doit être >= 1"));
        }
        Ok(())
    }

    /// Seuil comparé à |z|².
    pub fn bailout_sq(&self) -> f64 {
        self.escape_radius * self.escape_radius
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_matches_reference_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.bailout_sq(), 4.0);
        assert_eq!(config.kernel_path, PathBuf::from("kernels/fractal.wgsl"));
        assert_eq!(config.row_chunk, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.escape_radius = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.row_chunk = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.threads = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "row_chunk": 4, "threads": 2 }}"#).unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.row_chunk, 4);
        assert_eq!(config.threads, Some(2));
        assert_eq!(config.escape_radius, DEFAULT_ESCAPE_RADIUS);
    }

    #[test]
    fn unknown_json_field_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "bailout": 16.0 }}"#).unwrap();

        let err = EngineConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, EngineError::ConfigJson { .. }));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = EngineConfig::from_json_file(Path::new("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, EngineError::ConfigIo { .. }));
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
