// SYNOID Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use synoid_forge::config::ForgeConfig;
use synoid_forge::forge::ops::resize::resized_name;
use synoid_forge::forge::request::{
    Anchor, ConvertParams, GifOptions, InterpolateParams, InterpolationMethod, Quality, ResizeMode,
    ResizeParams, ScaleAlgorithm, Speed, Tiling, UpscaleBackend, UpscaleParams,
};
use synoid_forge::forge::{
    Completed, Destination, Dispatcher, ForgeContext, ForgeWorker, Operation, TransformRequest,
};

#[derive(Parser)]
#[command(name = "synoid-forge")]
#[command(about = "SYNOID Media Forge", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the engine executables
    #[arg(long, global = true)]
    tools_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one file, or a batch into a directory
    Convert {
        #[arg(short, long, num_args = 1.., required = true)]
        input: Vec<PathBuf>,

        /// Output file, or output directory for a batch
        #[arg(short, long)]
        output: PathBuf,

        /// Target extension for a batch (e.g. mp4, mp3, png)
        #[arg(long)]
        to: Option<String>,

        #[arg(short, long, value_enum, default_value_t = QualityArg::High)]
        quality: QualityArg,

        #[arg(short, long, value_enum, default_value_t = SpeedArg::Medium)]
        speed: SpeedArg,
    },

    /// Render animated GIFs
    Gif {
        #[arg(short, long, num_args = 1.., required = true)]
        input: Vec<PathBuf>,

        /// Output file, or output directory for several inputs
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value_t = 10)]
        fps: u32,

        /// Relative size (0.1 - 1.0)
        #[arg(long, default_value_t = 0.5)]
        scale: f64,

        /// Playback speed (0.1 - 10.0)
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },

    /// Stretch, fit or crop to an exact resolution
    Resize {
        #[arg(short, long)]
        input: PathBuf,

        /// Output file or directory
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        width: u32,

        #[arg(long)]
        height: u32,

        #[arg(short, long, value_enum, default_value_t = ModeArg::Stretch)]
        mode: ModeArg,

        #[arg(short, long, value_enum, default_value_t = AnchorArg::Center)]
        anchor: AnchorArg,
    },

    /// Upscale a still or a video by 2x or 4x
    Upscale {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, default_value_t = 2)]
        factor: u32,

        #[arg(short, long, value_enum, default_value_t = BackendArg::Classical)]
        engine: BackendArg,

        #[arg(long, value_enum, default_value_t = AlgorithmArg::Lanczos)]
        algorithm: AlgorithmArg,

        #[arg(long)]
        sharpen: bool,

        /// Explicit output width (classical engine, with --height)
        #[arg(long, requires = "height")]
        width: Option<u32>,

        #[arg(long, requires = "width")]
        height: Option<u32>,

        /// auto, low, medium, high, ultra or a tile size in pixels
        #[arg(long, default_value = "auto")]
        tiling: String,

        /// Run face restoration after a learned upscale
        #[arg(long)]
        faces: bool,
    },

    /// Raise the frame rate of a video
    Interpolate {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, value_enum, default_value_t = MethodArg::Classical)]
        method: MethodArg,

        /// Target frame rate (classical)
        #[arg(long, default_value_t = 60)]
        fps: u32,

        /// Frame multiplier, 2 or 4 (learned)
        #[arg(long, default_value_t = 2)]
        multiplier: u32,
    },

    /// Keep only [start, end)
    Trim {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        start: f64,

        #[arg(short, long)]
        end: f64,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Cut [start, end) out of a video
    Delete {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        start: f64,

        #[arg(short, long)]
        end: f64,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Splice a clip into a video
    Insert {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        clip: PathBuf,

        /// Insertion point in seconds
        #[arg(short, long)]
        at: f64,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Join clips in order
    Concat {
        #[arg(short, long, num_args = 2.., required = true)]
        input: Vec<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Save a single frame as an image
    Frame {
        #[arg(short, long)]
        input: PathBuf,

        /// Timestamp in seconds
        #[arg(short, long, default_value_t = 0.0)]
        at: f64,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show which engines are available
    Engines,
}

#[derive(Clone, Copy, ValueEnum)]
enum QualityArg {
    High,
    Medium,
    Low,
}

impl From<QualityArg> for Quality {
    fn from(q: QualityArg) -> Self {
        match q {
            QualityArg::High => Quality::High,
            QualityArg::Medium => Quality::Medium,
            QualityArg::Low => Quality::Low,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SpeedArg {
    Ultrafast,
    Fast,
    Medium,
    Slow,
}

impl From<SpeedArg> for Speed {
    fn from(s: SpeedArg) -> Self {
        match s {
            SpeedArg::Ultrafast => Speed::Ultrafast,
            SpeedArg::Fast => Speed::Fast,
            SpeedArg::Medium => Speed::Medium,
            SpeedArg::Slow => Speed::Slow,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Stretch,
    Fit,
    Crop,
}

impl From<ModeArg> for ResizeMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Stretch => ResizeMode::Stretch,
            ModeArg::Fit => ResizeMode::Fit,
            ModeArg::Crop => ResizeMode::Crop,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AnchorArg {
    Center,
    TopLeft,
    BottomRight,
}

impl From<AnchorArg> for Anchor {
    fn from(a: AnchorArg) -> Self {
        match a {
            AnchorArg::Center => Anchor::Center,
            AnchorArg::TopLeft => Anchor::TopLeft,
            AnchorArg::BottomRight => Anchor::BottomRight,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Classical,
    Learned,
}

impl From<BackendArg> for UpscaleBackend {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Classical => UpscaleBackend::Classical,
            BackendArg::Learned => UpscaleBackend::Learned,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    Lanczos,
    Spline,
    Neighbor,
}

impl From<AlgorithmArg> for ScaleAlgorithm {
    fn from(a: AlgorithmArg) -> Self {
        match a {
            AlgorithmArg::Lanczos => ScaleAlgorithm::Lanczos,
            AlgorithmArg::Spline => ScaleAlgorithm::Spline,
            AlgorithmArg::Neighbor => ScaleAlgorithm::Neighbor,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Classical,
    Learned,
}

impl From<MethodArg> for InterpolationMethod {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Classical => InterpolationMethod::Classical,
            MethodArg::Learned => InterpolationMethod::Learned,
        }
    }
}

fn parse_tiling(raw: &str) -> anyhow::Result<Tiling> {
    if let Some(t) = Tiling::preset(raw) {
        return Ok(t);
    }
    let tile: u32 = raw
        .parse()
        .with_context(|| format!("unknown tiling '{}'", raw))?;
    Ok(Tiling::Tile(tile))
}

/// Output path for one input: the file itself, or `<dir>/<name>` when the
/// output is an existing directory.
fn file_or_dir(output: &Path, name: impl FnOnce() -> String) -> PathBuf {
    if output.is_dir() {
        output.join(name())
    } else {
        output.to_path_buf()
    }
}

fn convert_request(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    extension: Option<String>,
    params: ConvertParams,
) -> TransformRequest {
    let batch = inputs.len() > 1 || output.is_dir();
    let destination = match (batch, extension) {
        (true, Some(extension)) => Destination::Directory { dir: output, extension },
        (true, None) => Destination::Directory {
            dir: output,
            extension: if params.gif.is_some() { "gif".to_string() } else { "mp4".to_string() },
        },
        (false, _) => Destination::File(output),
    };
    TransformRequest { inputs, destination, operation: Operation::Convert(params) }
}

fn build_request(command: Commands) -> anyhow::Result<TransformRequest> {
    let request = match command {
        Commands::Convert { input, output, to, quality, speed } => {
            let params = ConvertParams { quality: quality.into(), speed: speed.into(), gif: None };
            convert_request(input, output, to, params)
        }
        Commands::Gif { input, output, fps, scale, speed } => {
            let gif = GifOptions { fps, scale, speed };
            let params = ConvertParams { gif: Some(gif), ..ConvertParams::default() };
            convert_request(input, output, Some("gif".to_string()), params)
        }
        Commands::Resize { input, output, width, height, mode, anchor } => {
            let params = ResizeParams { width, height, mode: mode.into(), anchor: anchor.into() };
            let output = file_or_dir(&output, || resized_name(&input, &params));
            TransformRequest::single(input, output, Operation::Resize(params))
        }
        Commands::Upscale {
            input,
            output,
            factor,
            engine,
            algorithm,
            sharpen,
            width,
            height,
            tiling,
            faces,
        } => {
            let params = UpscaleParams {
                factor,
                backend: engine.into(),
                algorithm: algorithm.into(),
                sharpen,
                target: width.zip(height),
                tiling: parse_tiling(&tiling)?,
                enhance_faces: faces,
            };
            TransformRequest::single(input, output, Operation::Upscale(params))
        }
        Commands::Interpolate { input, output, method, fps, multiplier } => {
            let params = InterpolateParams { method: method.into(), target_fps: fps, multiplier };
            TransformRequest::single(input, output, Operation::Interpolate(params))
        }
        Commands::Trim { input, start, end, output } => {
            TransformRequest::single(input, output, Operation::Trim { start, end })
        }
        Commands::Delete { input, start, end, output } => {
            TransformRequest::single(input, output, Operation::DeleteSection { start, end })
        }
        Commands::Insert { input, clip, at, output } => {
            TransformRequest::single(input, output, Operation::InsertClip { clip, at })
        }
        Commands::Concat { input, output } => TransformRequest {
            inputs: input,
            destination: Destination::File(output),
            operation: Operation::Concatenate,
        },
        Commands::Frame { input, at, output } => {
            TransformRequest::single(input, output, Operation::ExtractFrame { at })
        }
        Commands::Engines => bail!("engines is not a transformation"),
    };
    Ok(request)
}

fn print_engines(ctx: &ForgeContext) {
    println!("SYNOID Forge engines:");
    for (kind, path) in ctx.toolbox.report() {
        match path {
            Some(p) => println!("  ✅ {:<24} {}", kind.name(), p.display()),
            None => println!("  ❌ {:<24} not found", kind.name()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    // Global panic handler: log panics instead of crashing silently
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("🚨 [SYNOID PANIC] at {}: {}", location, message);
    }));

    let args = Cli::parse();
    info!("--- SYNOID FORGE v{} ---", env!("CARGO_PKG_VERSION"));

    let config = ForgeConfig::load(args.config.as_deref())?.with_tools_dir(args.tools_dir);
    let ctx = ForgeContext::system(config);

    if let Commands::Engines = args.command {
        print_engines(&ctx);
        return Ok(());
    }

    let request = build_request(args.command)?;
    let worker = ForgeWorker::new(Dispatcher::new(ctx));
    let handle = worker.submit(request).await?;

    let result = handle
        .wait_with(|fraction| {
            print!("\r⏳ {:>3.0}%", fraction * 100.0);
            let _ = std::io::stdout().flush();
        })
        .await;
    println!();

    match result {
        Ok(Completed::Single(path)) => {
            println!("✅ Saved: {}", path.display());
            Ok(())
        }
        Ok(Completed::Batch(report)) => {
            for path in &report.succeeded {
                println!("✅ {}", path.display());
            }
            for failure in &report.failed {
                println!("❌ {}: {}", failure.input.display(), failure.error);
            }
            if report.is_clean() {
                Ok(())
            } else {
                bail!("{} of {} inputs failed", report.failed.len(), report.failed.len() + report.succeeded.len())
            }
        }
        Err(e) => {
            error!("Forge failed: {}", e);
            Err(e.into())
        }
    }
}
