use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use fractal_bench::fractal::DEFAULT_JULIA_C;
use fractal_bench::io::save_png;
use fractal_bench::{Backend, Engine, EngineConfig, FractalMode, FractalParams, Viewport};

/// Rendu Mandelbrot / Julia sur CPU séquentiel, CPU parallèle et GPU,
/// avec comparaison des temps.
///
/// Exemple d'utilisation :
///   fractal-bench --width 1920 --height 1080 --backend all --output image/mandelbrot.png
#[derive(Parser, Debug)]
#[command(
    name = "fractal-bench",
    about = "Compare les backends séquentiel, parallèle et GPU sur une fractale escape-time",
    version
)]
struct Cli {
    /// Largeur de l'image en pixels
    #[arg(long, default_value_t = 960)]
    width: u32,

    /// Hauteur de l'image en pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Nombre maximal d'itérations, commun à tous les backends
    #[arg(long, default_value_t = 1000)]
    max_iter: u32,

    /// Centre X du viewport dans le plan complexe
    #[arg(long, default_value_t = -0.5, allow_negative_numbers = true)]
    center_x: f64,

    /// Centre Y du viewport dans le plan complexe
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    center_y: f64,

    /// Largeur du viewport en unités du plan
    #[arg(long, default_value_t = 3.5)]
    scale: f64,

    /// Famille de fractale
    #[arg(long, value_enum, default_value_t = ModeChoice::Mandelbrot)]
    mode: ModeChoice,

    /// Partie réelle de la constante Julia
    #[arg(long, default_value_t = DEFAULT_JULIA_C.re, allow_negative_numbers = true)]
    c_real: f64,

    /// Partie imaginaire de la constante Julia
    #[arg(long, default_value_t = DEFAULT_JULIA_C.im, allow_negative_numbers = true)]
    c_imag: f64,

    /// Backend(s) à exécuter
    #[arg(long, value_enum, default_value_t = BackendChoice::All)]
    backend: BackendChoice,

    /// Fichier de configuration JSON du moteur
    #[arg(long, value_name = "FICHIER")]
    config: Option<PathBuf>,

    /// Source WGSL du kernel GPU
    #[arg(long, value_name = "FICHIER")]
    kernel: Option<PathBuf>,

    /// Rayon d'échappement (2 par défaut)
    #[arg(long)]
    escape_radius: Option<f64>,

    /// Nombre de threads du backend parallèle
    #[arg(long)]
    threads: Option<usize>,

    /// Lignes par unité de travail du backend parallèle
    #[arg(long)]
    row_chunk: Option<usize>,

    /// Fichier PNG de sortie
    #[arg(long, value_name = "FICHIER")]
    output: Option<PathBuf>,

    /// Journalisation détaillée (niveau debug)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Mandelbrot,
    Julia,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Serial,
    Parallel,
    Gpu,
    All,
}

impl BackendChoice {
    fn backends(self) -> &'static [Backend] {
        match self {
            BackendChoice::Serial => &[Backend::Sequential],
            BackendChoice::Parallel => &[Backend::Parallel],
            BackendChoice::Gpu => &[Backend::Gpu],
            BackendChoice::All => &Backend::ALL,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Fichier JSON éventuel, puis surcharges de la ligne de commande.
fn build_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(kernel) = &cli.kernel {
        config.kernel_path = kernel.clone();
    }
    if let Some(radius) = cli.escape_radius {
        config.escape_radius = radius;
    }
    if let Some(threads) = cli.threads {
        config.threads = Some(threads);
    }
    if let Some(row_chunk) = cli.row_chunk {
        config.row_chunk = row_chunk;
    }
    Ok(config)
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let engine = Engine::new(build_config(cli)?)?;
    let viewport = Viewport::new(cli.width, cli.height, cli.center_x, cli.center_y, cli.scale)?;
    let mode = match cli.mode {
        ModeChoice::Mandelbrot => FractalMode::Mandelbrot,
        ModeChoice::Julia => FractalMode::julia(cli.c_real, cli.c_imag),
    };
    let params = FractalParams::new(cli.max_iter, mode)?;

    println!(
        "Génération {} {}x{} (max_iter = {})...",
        mode.name(),
        viewport.width,
        viewport.height,
        params.max_iter
    );
    let run = engine.benchmark(&viewport, &params, cli.backend.backends())?;
    println!("{}", run.report);

    if let Some(err) = &run.gpu_error {
        eprintln!("GPU indisponible (code {}): {err}", err.code());
        if run.cpu_image.is_none() {
            return Ok(ExitCode::FAILURE);
        }
        tracing::warn!("repli sur l'image calculée par le CPU");
    }

    if let Some(path) = &cli.output {
        let image = run.image().context("aucune image produite")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("création du répertoire {}", parent.display()))?;
        }
        save_png(path, image, viewport.width, viewport.height)
            .with_context(|| format!("écriture de {}", path.display()))?;
        println!("Enregistré dans {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Erreur: {e:#}");
            ExitCode::FAILURE
        }
    }
}
