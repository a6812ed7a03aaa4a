use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ab_glyph::FontRef;
use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use cardlens::detection::ocr::default_models_dir;
use cardlens::detection::preprocessing::load_image;
use cardlens::downloader::{DownloadOptions, ImageDownloader, ProgressCallback};
use cardlens::{annotate, CardDetector, Catalog, DetectorConfig, OcrsRecognizer, StageTrace};

#[derive(Parser)]
#[command(name = "cardlens")]
#[command(about = "Detect trading cards in photos and identify them against a card catalog")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect and identify cards in a photo
    Detect(DetectArgs),
    /// Download reference artwork for every catalog entry
    FetchImages(FetchArgs),
}

#[derive(Args)]
struct DetectArgs {
    /// Path to the photo
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Card catalog JSON file
    #[arg(long, default_value = "cardinfo.json")]
    catalog: PathBuf,

    /// Directory holding the OCR models (defaults to ~/.cache/ocrs)
    #[arg(long, value_name = "DIR")]
    models_dir: Option<PathBuf>,

    /// Write numbered stage snapshots into this directory
    #[arg(long, value_name = "DIR")]
    trace_out: Option<PathBuf>,

    /// Where the annotated photo is written
    #[arg(long, default_value = "annotated.png")]
    out: PathBuf,

    /// TTF/OTF font for labels on the annotated photo (frames only if omitted)
    #[arg(long, value_name = "FONT")]
    font: Option<PathBuf>,

    /// Print annotations as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Side length of the square working image
    #[arg(long, default_value_t = 750)]
    working_size: u32,

    /// Minimum bounding-box side for a candidate, in working pixels
    #[arg(long, default_value_t = 100)]
    min_box_size: u32,

    /// Similarity floor (0-100) for accepting a catalog match
    #[arg(long, default_value_t = 70.0)]
    min_similarity: f64,

    /// Seconds allowed for a single OCR pass
    #[arg(long, default_value_t = 10)]
    ocr_timeout: u64,
}

#[derive(Args)]
struct FetchArgs {
    /// Card catalog JSON file
    #[arg(long, default_value = "cardinfo.json")]
    catalog: PathBuf,

    /// Directory the images are written into
    #[arg(long, default_value = "images")]
    out_dir: PathBuf,

    /// Re-download images that already exist locally
    #[arg(long)]
    force: bool,

    /// Milliseconds to wait after each download
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Detect(args) => run_detect(args),
        Command::FetchImages(args) => run_fetch(args),
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "cardlens=debug" } else { "cardlens=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_detect(args: DetectArgs) -> anyhow::Result<()> {
    let catalog = Catalog::load(&args.catalog)?;

    let models_dir = match args.models_dir {
        Some(dir) => dir,
        None => default_models_dir()?,
    };
    let config = DetectorConfig::new()
        .with_working_size(args.working_size)
        .with_min_box_size(args.min_box_size)
        .with_min_similarity(args.min_similarity)
        .with_ocr_timeout(Duration::from_secs(args.ocr_timeout));
    let recognizer = OcrsRecognizer::load(&models_dir, Duration::from_secs(args.ocr_timeout))?;
    let detector = CardDetector::new(config, catalog, Arc::new(recognizer))?;

    let trace = match &args.trace_out {
        Some(dir) => Some(StageTrace::create(dir)?),
        None => None,
    };

    let mut photo = load_image(&args.image)?;
    let detection = detector.detect(&photo, trace.as_ref());
    let annotations = annotate::to_annotations(&detection);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&annotations)?);
    } else if annotations.is_empty() {
        println!("No cards detected.");
    } else {
        println!("Detected {} card(s):", annotations.len());
        for ann in &annotations {
            println!(
                "  {} (id {}) score {:.1} at ({}, {}) size {}x{}",
                ann.label,
                ann.card_id,
                ann.score,
                ann.bbox.x,
                ann.bbox.y,
                ann.bbox.width,
                ann.bbox.height
            );
        }
    }

    let font_data = match &args.font {
        Some(path) => {
            Some(std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?)
        }
        None => None,
    };
    let font = match &font_data {
        Some(data) => {
            Some(FontRef::try_from_slice(data).context("font file is not a usable TTF/OTF")?)
        }
        None => None,
    };

    annotate::render(&mut photo, &annotations, font.as_ref());
    if let Some(trace) = &trace {
        trace.save_rgb("annotated", &photo);
    }
    photo.save(&args.out)
        .with_context(|| format!("writing {}", args.out.display()))?;
    if !args.json {
        println!("Annotated photo written to {}", args.out.display());
    }

    Ok(())
}

fn run_fetch(args: FetchArgs) -> anyhow::Result<()> {
    let catalog = Catalog::load(&args.catalog)?;
    println!("Fetching images for {} catalog entries...", catalog.len());

    let mut options = DownloadOptions::new(&args.out_dir);
    options.force = args.force;
    options.delay = Duration::from_millis(args.delay_ms);
    let downloader = ImageDownloader::new(options)?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();

    let progress: ProgressCallback = Box::new(|done, total| {
        if done % 50 == 0 || done == total {
            println!("  {done}/{total}");
        }
    });

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let summary = runtime.block_on(async {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });
        downloader.fetch_all(&catalog, Some(progress), &cancel).await
    })?;

    println!(
        "Downloaded {}, skipped {}, failed {}{}",
        summary.downloaded,
        summary.skipped,
        summary.failed,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
    Ok(())
}
