//! Backend GPU (wgpu).
//!
//! Chaque appel à [`render_gpu`] ouvre une session complète : découverte de
//! l'adaptateur, création du device et de la queue, lecture et compilation
//! du kernel, allocation des buffers, dispatch puis relecture. Rien n'est
//! mis en cache entre deux appels ; toutes les ressources sont libérées en
//! sortie de fonction, y compris sur les chemins d'erreur.

mod session;

use std::path::PathBuf;

use crate::config::EngineConfig;
use crate::fractal::{FractalParams, Viewport};
use crate::render::escape_time::check_buffer;

pub use session::device_rank;

/// Code de retour d'un rendu GPU réussi.
pub const STATUS_OK: i32 = 0;

/// Échecs du backend GPU. Aucun n'est fatal pour le processus : l'appelant
/// peut se replier sur un backend CPU.
#[derive(thiserror::Error, Debug)]
pub enum GpuError {
    #[error("aucune plateforme GPU trouvée")]
    NoPlatform,

    #[error("aucun périphérique GPU trouvé")]
    NoDevice,

    #[error("kernel introuvable {path}: {source}")]
    KernelSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `log` contient le journal complet du compilateur de shaders.
    #[error("erreur de compilation du kernel `{entry_point}`:\n{log}")]
    Compile { entry_point: &'static str, log: String },

    #[error("création du device GPU: {0}")]
    DeviceRequest(String),

    #[error("buffer de sortie trop grand: {requested} octets (limite {limit})")]
    ResourceExhausted { requested: u64, limit: u64 },

    #[error("relecture du buffer GPU: {0}")]
    Readback(String),
}

impl GpuError {
    /// Code de statut négatif, un par classe d'échec.
    pub fn code(&self) -> i32 {
        match self {
            GpuError::NoPlatform => -1,
            GpuError::NoDevice => -2,
            GpuError::KernelSource { .. } => -3,
            GpuError::Compile { .. } => -4,
            GpuError::DeviceRequest(_) => -5,
            GpuError::ResourceExhausted { .. } => -6,
            GpuError::Readback(_) => -7,
        }
    }
}

/// Convertit le résultat d'un rendu GPU en code de statut (0 = succès).
pub fn status_code(result: &Result<(), GpuError>) -> i32 {
    match result {
        Ok(()) => STATUS_OK,
        Err(err) => err.code(),
    }
}

/// Rendu GPU complet d'une image dans `image`.
///
/// En cas d'échec le contenu de `image` n'est pas spécifié ; l'hôte n'y
/// écrit qu'à l'étape de relecture, donc un échec antérieur le laisse intact.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(width = viewport.width, height = viewport.height, mode = params.mode.name())
)]
pub fn render_gpu(
    config: &EngineConfig,
    viewport: &Viewport,
    params: &FractalParams,
    image: &mut [u8],
) -> Result<(), GpuError> {
    check_buffer(viewport, image);
    let result = pollster::block_on(session::run(config, viewport, params, image));
    if let Err(err) = &result {
        match err {
            GpuError::Compile { entry_point, log } => {
                tracing::error!(entry_point, "échec de compilation du kernel:\n{log}");
            }
            other => tracing::warn!(code = other.code(), "rendu GPU impossible: {other}"),
        }
    }
    result
}
