use std::path::PathBuf;

use crate::gpu::GpuError;

/// Résultat utilisé par les API du moteur.
pub type EngineResult<T> = Result<T, EngineError>;

/// Erreurs du moteur escape-time.
///
/// Une taille de buffer incorrecte n'apparaît pas ici : c'est une violation
/// de contrat côté appelant, signalée par une panique.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// Largeur ou hauteur nulle.
    #[error("dimensions invalides: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Échelle du viewport non finie ou négative.
    #[error("échelle invalide: {0}")]
    InvalidScale(f64),

    /// `max_iter` doit être strictement positif.
    #[error("max_iter doit être > 0")]
    ZeroIterations,

    /// Valeur de configuration rejetée par `EngineConfig::validate`.
    #[error("configuration invalide: {0}")]
    Config(String),

    #[error("lecture de la configuration {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration JSON {path}: {source}")]
    ConfigJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_errors_convert_transparently() {
        let err: EngineError = GpuError::NoPlatform.into();
        assert_eq!(err.to_string(), GpuError::NoPlatform.to_string());
    }

    #[test]
    fn config_helper_builds_config_variant() {
        let err = EngineError::config("row_chunk");
        assert!(matches!(err, EngineError::Config(ref m) if m == "row_chunk"));
        assert_eq!(err.to_string(), "configuration invalide: row_chunk");
    }
}
