pub mod escape_time;

use std::fmt;
use std::sync::Arc;

use rayon::ThreadPool;

pub use escape_time::{render_parallel, render_sequential};

use crate::bench::{time_backend, BenchmarkReport, BenchmarkRun};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::fractal::{FractalParams, Viewport};
use crate::gpu::{render_gpu, GpuError};

/// Les trois stratégies d'exécution interchangeables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backend {
    Sequential,
    Parallel,
    Gpu,
}

impl Backend {
    /// Ordre d'exécution d'un benchmark.
    pub const ALL: [Backend; 3] = [Backend::Sequential, Backend::Parallel, Backend::Gpu];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Sequential => "Serial",
            Backend::Parallel => "Parallel",
            Backend::Gpu => "GPU",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Point d'entrée du moteur : porte la configuration et dispatche vers
/// les backends. Chaque rendu est indépendant, aucun état n'est conservé
/// entre deux appels, hormis le pool rayon dédié.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    /// Pool dédié, construit dans `new` quand `threads` est configuré :
    /// aucun thread n'est créé pendant un rendu.
    pool: Option<Arc<ThreadPool>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let pool = match config.threads {
            Some(threads) => Some(Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("fractal-worker-{i}"))
                    .build()?,
            )),
            None => None,
        };
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn render_sequential(&self, viewport: &Viewport, params: &FractalParams, image: &mut [u8]) {
        render_sequential(viewport, params, self.config.bailout_sq(), image);
    }

    /// Nombre de threads du backend parallèle.
    pub fn parallel_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Utilise le pool dédié si `threads` est configuré, sinon le pool global.
    pub fn render_parallel(&self, viewport: &Viewport, params: &FractalParams, image: &mut [u8]) -> EngineResult<()> {
        let bailout_sq = self.config.bailout_sq();
        let row_chunk = self.config.row_chunk;
        match &self.pool {
            Some(pool) => pool.install(|| render_parallel(viewport, params, bailout_sq, row_chunk, image)),
            None => render_parallel(viewport, params, bailout_sq, row_chunk, image),
        }
        Ok(())
    }

    pub fn render_gpu(&self, viewport: &Viewport, params: &FractalParams, image: &mut [u8]) -> Result<(), GpuError> {
        render_gpu(&self.config, viewport, params, image)
    }

    pub fn render(
        &self,
        backend: Backend,
        viewport: &Viewport,
        params: &FractalParams,
        image: &mut [u8],
    ) -> EngineResult<()> {
        match backend {
            Backend::Sequential => {
                self.render_sequential(viewport, params, image);
                Ok(())
            }
            Backend::Parallel => self.render_parallel(viewport, params, image),
            Backend::Gpu => Ok(self.render_gpu(viewport, params, image)?),
        }
    }

    /// Exécute les backends demandés dans l'ordre Serial, Parallel, GPU.
    ///
    /// Les backends CPU écrivent l'un après l'autre dans le même buffer ; le
    /// GPU écrit dans le sien, un échec GPU n'altère donc jamais l'image CPU.
    /// Un échec GPU est rapporté dans le résultat, pas comme erreur.
    pub fn benchmark(
        &self,
        viewport: &Viewport,
        params: &FractalParams,
        backends: &[Backend],
    ) -> EngineResult<BenchmarkRun> {
        let mut report = BenchmarkReport::default();
        let mut cpu_image = None;
        let mut gpu_image = None;
        let mut gpu_error = None;

        for backend in Backend::ALL.into_iter().filter(|b| backends.contains(b)) {
            match backend {
                Backend::Sequential | Backend::Parallel => {
                    let image = cpu_image.get_or_insert_with(|| vec![0u8; viewport.buffer_len()]);
                    let (result, timing) = time_backend(|| self.render(backend, viewport, params, image));
                    result?;
                    tracing::info!(backend = backend.name(), seconds = timing.as_secs_f64(), "rendu terminé");
                    report.record(backend, timing);
                }
                Backend::Gpu => {
                    let mut image = vec![0u8; viewport.buffer_len()];
                    let (result, timing) = time_backend(|| self.render_gpu(viewport, params, &mut image));
                    match result {
                        Ok(()) => {
                            tracing::info!(backend = backend.name(), seconds = timing.as_secs_f64(), "rendu terminé");
                            report.record(backend, timing);
                            gpu_image = Some(image);
                        }
                        Err(err) => gpu_error = Some(err),
                    }
                }
            }
        }

        Ok(BenchmarkRun {
            report,
            cpu_image,
            gpu_image,
            gpu_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::fractal::FractalMode;

    fn small_scene() -> (Viewport, FractalParams) {
        (
            Viewport::new(48, 32, -0.5, 0.0, 3.5).unwrap(),
            FractalParams::new(120, FractalMode::Mandelbrot).unwrap(),
        )
    }

    #[test]
    fn dedicated_pool_matches_sequential() {
        let (viewport, params) = small_scene();
        let engine = Engine::new(EngineConfig {
            threads: Some(2),
            row_chunk: 5,
            ..EngineConfig::default()
        })
        .unwrap();

        let mut serial = vec![0u8; viewport.buffer_len()];
        let mut parallel = vec![0u8; viewport.buffer_len()];
        engine.render(Backend::Sequential, &viewport, &params, &mut serial).unwrap();
        engine.render(Backend::Parallel, &viewport, &params, &mut parallel).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn dedicated_pool_is_reused_across_renders() {
        let (viewport, params) = small_scene();
        let engine = Engine::new(EngineConfig {
            threads: Some(3),
            ..EngineConfig::default()
        })
        .unwrap();
        assert_eq!(engine.parallel_threads(), 3);

        let mut expected = vec![0u8; viewport.buffer_len()];
        engine.render_sequential(&viewport, &params, &mut expected);

        let clone = engine.clone();
        for renderer in [&engine, &engine, &clone] {
            let mut image = vec![0xFFu8; viewport.buffer_len()];
            renderer.render_parallel(&viewport, &params, &mut image).unwrap();
            assert_eq!(image, expected);
        }
        assert!(Arc::ptr_eq(
            engine.pool.as_ref().unwrap(),
            clone.pool.as_ref().unwrap()
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            row_chunk: 0,
            ..EngineConfig::default()
        };
        assert!(Engine::new(config).is_err());
    }

    #[test]
    fn benchmark_records_only_requested_backends() {
        let (viewport, params) = small_scene();
        let engine = Engine::default();
        let run = engine
            .benchmark(&viewport, &params, &[Backend::Parallel, Backend::Sequential])
            .unwrap();
        assert!(run.report.serial.is_some());
        assert!(run.report.parallel.is_some());
        assert!(run.report.gpu.is_none());
        assert!(run.gpu_image.is_none());
        assert!(run.gpu_error.is_none());
        assert_eq!(run.cpu_image.map(|img| img.len()), Some(viewport.buffer_len()));
    }

    #[test]
    fn gpu_failure_keeps_cpu_image() {
        let (viewport, params) = small_scene();
        let engine = Engine::new(EngineConfig {
            kernel_path: PathBuf::from("kernels/absent.wgsl"),
            ..EngineConfig::default()
        })
        .unwrap();

        let run = engine.benchmark(&viewport, &params, &Backend::ALL).unwrap();

        let err = run.gpu_error.expect("le GPU doit échouer sans kernel");
        assert!(err.code() < 0);
        assert!(run.report.gpu.is_none());
        assert!(run.report.gpu_vs_serial().is_none());

        let mut expected = vec![0u8; viewport.buffer_len()];
        engine.render_sequential(&viewport, &params, &mut expected);
        assert_eq!(run.cpu_image, Some(expected));
    }
}
