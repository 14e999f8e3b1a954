use std::fmt;
use std::time::{Duration, Instant};

use crate::gpu::GpuError;
use crate::render::Backend;

/// Durée murale d'un rendu complet.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct BackendTiming(Duration);

impl BackendTiming {
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(Duration::from_secs_f64(secs))
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0.as_secs_f64()
    }

    pub fn duration(self) -> Duration {
        self.0
    }
}

/// Chronomètre un appel de backend avec une horloge monotone.
pub fn time_backend<R>(f: impl FnOnce() -> R) -> (R, BackendTiming) {
    let start = Instant::now();
    let result = f();
    (result, BackendTiming(start.elapsed()))
}

/// `numerator / denominator`, indéfini si l'une des mesures manque ou si
/// le dénominateur est nul.
pub fn speedup(numerator: Option<BackendTiming>, denominator: Option<BackendTiming>) -> Option<f64> {
    let num = numerator?.as_secs_f64();
    let den = denominator?.as_secs_f64();
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Temps par backend et ratios dérivés.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BenchmarkReport {
    pub serial: Option<BackendTiming>,
    pub parallel: Option<BackendTiming>,
    pub gpu: Option<BackendTiming>,
}

impl BenchmarkReport {
    pub fn record(&mut self, backend: Backend, timing: BackendTiming) {
        match backend {
            Backend::Sequential => self.serial = Some(timing),
            Backend::Parallel => self.parallel = Some(timing),
            Backend::Gpu => self.gpu = Some(timing),
        }
    }

    /// Séquentiel / parallèle.
    pub fn parallel_speedup(&self) -> Option<f64> {
        speedup(self.serial, self.parallel)
    }

    /// Parallèle / GPU.
    pub fn gpu_vs_parallel(&self) -> Option<f64> {
        speedup(self.parallel, self.gpu)
    }

    /// Séquentiel / GPU.
    pub fn gpu_vs_serial(&self) -> Option<f64> {
        speedup(self.serial, self.gpu)
    }
}

struct Seconds(Option<BackendTiming>);

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(t) => write!(f, "{:.3}s", t.as_secs_f64()),
            None => f.write_str("n/a"),
        }
    }
}

struct Ratio(Option<f64>);

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(r) => write!(f, "{r:.3}x"),
            None => f.write_str("n/a"),
        }
    }
}

/// Même présentation que le panneau de statistiques de l'explorateur.
impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Serial: {}", Seconds(self.serial))?;
        writeln!(f, "Parallel: {} ({})", Seconds(self.parallel), Ratio(self.parallel_speedup()))?;
        writeln!(f, "GPU: {}", Seconds(self.gpu))?;
        writeln!(f, "GPU vs CPU: {}", Ratio(self.gpu_vs_parallel()))?;
        write!(f, "GPU vs Serial: {}", Ratio(self.gpu_vs_serial()))
    }
}

/// Résultat d'un benchmark : temps, images produites et éventuel échec GPU.
#[derive(Debug)]
pub struct BenchmarkRun {
    pub report: BenchmarkReport,
    /// Image des backends CPU (le dernier exécuté).
    pub cpu_image: Option<Vec<u8>>,
    pub gpu_image: Option<Vec<u8>>,
    pub gpu_error: Option<GpuError>,
}

impl BenchmarkRun {
    /// Image à afficher ou enregistrer : CPU en priorité, sinon GPU.
    pub fn image(&self) -> Option<&[u8]> {
        self.cpu_image.as_deref().or(self.gpu_image.as_deref())
    }
}
