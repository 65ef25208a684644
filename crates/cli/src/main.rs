use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

use framewindow_core::model::domain::batch_model::{Autoencoder, BatchModel, EncodeDecode};
use framewindow_core::model::infrastructure::onnx_batch_model::{OnnxAutoencoder, OnnxBatchModel};
use framewindow_core::pipeline::encode_video_use_case::EncodeVideoUseCase;
use framewindow_core::pipeline::export_batch_use_case::ExportBatchUseCase;
use framewindow_core::pipeline::frame_metrics::format_seconds;
use framewindow_core::pipeline::pass_logger::LogPassLogger;
use framewindow_core::pipeline::reconstruct_video_use_case::ReconstructVideoUseCase;
use framewindow_core::shared::constants::VIDEO_EXTENSIONS;
use framewindow_core::video::infrastructure::ffmpeg_source::FfmpegSource;
use framewindow_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use framewindow_core::windowing::loader_config::LoaderConfig;
use framewindow_core::windowing::pass::LoaderItem;
use framewindow_core::windowing::video_loader::VideoLoader;

/// Windowed frame batching, sampling and model reconstruction for videos.
#[derive(Parser)]
#[command(name = "framewindow")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print source metadata and the resolved window.
    Info(LoaderArgs),

    /// Run one pass and report (or export) every batch.
    Batches {
        #[command(flatten)]
        loader: LoaderArgs,

        /// Write each batch as its own video into this directory.
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Stop after this many batches.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Write a reproducible random subset of the window to a video.
    Sample {
        #[command(flatten)]
        loader: LoaderArgs,

        /// Output video file.
        output: PathBuf,

        /// Fraction of window frames to keep (0.0-1.0].
        #[arg(long, default_value = "0.1")]
        ratio: f64,

        /// Sampling seed (default 42).
        #[arg(long)]
        seed: Option<u64>,

        /// Keep every frame of the window instead of a subset.
        #[arg(long)]
        all: bool,
    },

    /// Feed the window through an ONNX model and write the result.
    Reconstruct {
        #[command(flatten)]
        loader: LoaderArgs,

        /// Output video file.
        output: PathBuf,

        #[command(flatten)]
        model: ModelArgs,

        /// Log progress every N batches.
        #[arg(long, default_value = "10")]
        log_every: usize,
    },

    /// Encode the window with an ONNX encoder and report the latent shape.
    Encode {
        #[command(flatten)]
        loader: LoaderArgs,

        /// Encoder model.
        #[arg(long)]
        encoder: PathBuf,

        /// Model expects [batch, channels, height, width] input.
        #[arg(long)]
        channels_first: bool,
    },
}

#[derive(Args)]
struct LoaderArgs {
    /// Input video file.
    input: PathBuf,

    /// JSON loader settings. Flags given on the command line override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames per batch.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Fresh frames per batch; must divide the batch size.
    #[arg(long)]
    stride: Option<usize>,

    /// Frames skipped after each frame read.
    #[arg(long)]
    skip_frame: Option<usize>,

    /// Window start in seconds (snapped up to a batch boundary).
    #[arg(long)]
    start: Option<f64>,

    /// Window start as an absolute frame index.
    #[arg(long)]
    start_frame: Option<usize>,

    /// Window length in seconds (rounded up to whole batches).
    #[arg(long)]
    duration: Option<f64>,

    /// Window length in frames.
    #[arg(long)]
    duration_frames: Option<usize>,

    /// Shuffle the frame order of each pass.
    #[arg(long)]
    random: bool,

    /// Reduce frames to a single luminance channel.
    #[arg(long)]
    grayscale: bool,

    /// Resize frames, given as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_size)]
    size: Option<(u32, u32)>,

    /// Split the last frame of each batch off as a prediction target.
    #[arg(long)]
    predict_next_frame: bool,
}

#[derive(Args)]
struct ModelArgs {
    /// Single model mapping a batch to its reconstruction.
    #[arg(long, conflicts_with_all = ["encoder", "decoder"])]
    model: Option<PathBuf>,

    /// Encoder half of an autoencoder (requires --decoder).
    #[arg(long, requires = "decoder")]
    encoder: Option<PathBuf>,

    /// Decoder half of an autoencoder (requires --encoder).
    #[arg(long, requires = "encoder")]
    decoder: Option<PathBuf>,

    /// Model expects [batch, channels, height, width] input.
    #[arg(long)]
    channels_first: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Info(args) => run_info(&args),
        Command::Batches {
            loader,
            export_dir,
            limit,
        } => run_batches(&loader, export_dir.as_deref(), limit),
        Command::Sample {
            loader,
            output,
            ratio,
            seed,
            all,
        } => run_sample(&loader, &output, ratio, seed, all),
        Command::Reconstruct {
            loader,
            output,
            model,
            log_every,
        } => run_reconstruct(&loader, &output, &model, log_every),
        Command::Encode {
            loader,
            encoder,
            channels_first,
        } => run_encode(&loader, &encoder, channels_first),
    }
}

fn run_info(args: &LoaderArgs) -> Result<(), Box<dyn std::error::Error>> {
    let loader = open_loader(args)?;
    let d = loader.descriptor();
    let plan = loader.plan();

    println!("Source:      {}", loader.path().display());
    println!("Frames:      {}", d.total_frames);
    println!("Frame rate:  {:.3} fps (planned at {})", d.fps, d.whole_fps());
    println!("Native size: {}x{}", d.width, d.height);
    println!(
        "Output:      {}x{}x{}",
        d.output_width(),
        d.output_height(),
        d.output_channels()
    );
    println!(
        "Window:      frames {}..{} ({}s)",
        plan.start_frame,
        plan.start_frame + plan.span_frames,
        format_seconds(loader.duration())
    );
    println!(
        "Batching:    batch {}, stride {}, skip {}",
        plan.batch_size, plan.stride, plan.skip_frame
    );
    Ok(())
}

fn run_batches(
    args: &LoaderArgs,
    export_dir: Option<&Path>,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut loader = open_loader(args)?;
    let fps = loader.descriptor().fps;

    if let Some(dir) = export_dir {
        std::fs::create_dir_all(dir)?;
    }
    let mut exporter = ExportBatchUseCase::new(Box::new(FfmpegWriter::new()));

    let mut count = 0;
    for (i, item) in loader.pass()?.enumerate() {
        if limit.is_some_and(|max| i >= max) {
            break;
        }
        match &item {
            LoaderItem::Batch(batch) => {
                println!("batch {i:4}: {}", describe_indices(&batch.indices()));
            }
            LoaderItem::NextFrame { context, target } => {
                println!(
                    "batch {i:4}: {} -> {}",
                    describe_indices(&context.indices()),
                    target.index()
                );
            }
        }
        if let Some(dir) = export_dir {
            let path = dir.join(format!("batch_{i:04}.mp4"));
            exporter.export_frames(item.into_batch().frames(), fps, &path)?;
        }
        count += 1;
    }

    log::info!("{count} batches");
    Ok(())
}

fn run_sample(
    args: &LoaderArgs,
    output: &Path,
    ratio: f64,
    seed: Option<u64>,
    all: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut loader = open_loader(args)?;
    let batch = if all {
        loader.all_frames()?
    } else {
        loader.random_frames(ratio, seed)?
    };
    if batch.is_empty() {
        return Err("Window contains no frames to sample".into());
    }

    let fps = loader.descriptor().fps;
    let mut exporter = ExportBatchUseCase::new(Box::new(FfmpegWriter::new()));
    let written = exporter.export_frames(batch.frames(), fps, output)?;
    println!("Wrote {written} frames to {}", output.display());
    Ok(())
}

fn run_reconstruct(
    args: &LoaderArgs,
    output: &Path,
    model_args: &ModelArgs,
    log_every: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = build_model(model_args)?;
    let mut loader = open_loader(args)?;
    let fps = loader.descriptor().fps;

    let mut use_case =
        ReconstructVideoUseCase::new(model, Some(Box::new(LogPassLogger::new(log_every))));
    let result = use_case.execute(&mut loader)?;
    if result.batches == 0 {
        return Err("Window contains no frames to reconstruct".into());
    }

    let mut exporter = ExportBatchUseCase::new(Box::new(FfmpegWriter::new()));
    exporter.export_array(result.output.view(), fps, output)?;

    if result.error < 0.0 {
        println!("Reconstruction error: n/a (model changed the frame shape)");
    } else {
        println!("Reconstruction error (RMS): {:.4}", result.error);
    }
    println!("Output written to {}", output.display());
    Ok(())
}

fn run_encode(
    args: &LoaderArgs,
    encoder: &Path,
    channels_first: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let autoencoder: Box<dyn Autoencoder> =
        Box::new(OnnxAutoencoder::encoder_only(encoder, channels_first)?);
    let mut loader = open_loader(args)?;

    let mut use_case = EncodeVideoUseCase::new(autoencoder, Some(Box::new(LogPassLogger::default())));
    let codes = use_case.execute(&mut loader)?;
    println!("Latent shape: {:?}", codes.shape());
    if let Some(mean) = codes.mean() {
        println!("Latent mean:  {mean:.4}");
    }
    Ok(())
}

fn build_model(args: &ModelArgs) -> Result<Box<dyn BatchModel>, Box<dyn std::error::Error>> {
    match (&args.model, &args.encoder, &args.decoder) {
        (Some(path), _, _) => Ok(Box::new(OnnxBatchModel::new(path, args.channels_first)?)),
        (None, Some(encoder), Some(decoder)) => Ok(Box::new(EncodeDecode::new(
            OnnxAutoencoder::new(encoder, decoder, args.channels_first)?,
        ))),
        _ => Err("Either --model or both --encoder and --decoder are required".into()),
    }
}

fn open_loader(args: &LoaderArgs) -> Result<VideoLoader, Box<dyn std::error::Error>> {
    validate(args)?;
    let config = build_config(args)?;
    Ok(VideoLoader::open(
        Box::new(FfmpegSource::new()),
        &args.input,
        config,
    )?)
}

fn build_config(args: &LoaderArgs) -> Result<LoaderConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => LoaderConfig::from_json_file(path)?,
        None => LoaderConfig::default(),
    };

    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if args.stride.is_some() {
        config.stride = args.stride;
    }
    if let Some(skip) = args.skip_frame {
        config.skip_frame = skip;
    }
    if args.start.is_some() {
        config.start_seconds = args.start;
    }
    if args.start_frame.is_some() {
        config.start_frame = args.start_frame;
    }
    if args.duration.is_some() {
        config.duration_seconds = args.duration;
    }
    if args.duration_frames.is_some() {
        config.duration_frames = args.duration_frames;
    }
    if args.size.is_some() {
        config.target_size = args.size;
    }
    config.random_order |= args.random;
    config.grayscale |= args.grayscale;
    config.predict_next_frame |= args.predict_next_frame;

    config.validate()?;
    Ok(config)
}

fn validate(args: &LoaderArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.input.exists() {
        return Err(format!("Input file not found: {}", args.input.display()).into());
    }
    if let Some(config) = &args.config {
        if !config.exists() {
            return Err(format!("Config file not found: {}", config.display()).into());
        }
    }
    if !is_video(&args.input) {
        log::warn!(
            "{} does not have a known video extension, trying anyway",
            args.input.display()
        );
    }
    Ok(())
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid width '{w}': {e}"))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid height '{h}': {e}"))?;
    if width == 0 || height == 0 {
        return Err(format!("size must be non-zero, got '{value}'"));
    }
    Ok((width, height))
}

/// `"0..63"` for contiguous runs, the full list otherwise.
fn describe_indices(indices: &[usize]) -> String {
    let contiguous = indices.windows(2).all(|w| w[1] == w[0] + 1);
    match (indices.first(), indices.last()) {
        (Some(first), Some(last)) if contiguous => {
            format!("{first}..{last} ({} frames)", indices.len())
        }
        _ => format!("{indices:?}"),
    }
}
