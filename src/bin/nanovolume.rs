use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use nanovolume::{
    CaptureOpts, CaptureTick, Channels, ExperimentCapture, RenderDevice, RenderPipeline,
    TickReport, VolumeLoader, VolumeManifest,
};

#[derive(Parser, Debug)]
#[command(name = "nanovolume", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Advance the pipeline a number of frames and write the last one as a PNG.
    Render(RenderArgs),
    /// Run a fixed-length capture and save frames, ground truth and sidecar.
    Capture(CaptureArgs),
    /// Save the current frame, its ground truth and a sidecar.
    Snapshot(SnapshotArgs),
    /// Print the RMSE between two PNG images.
    Rmse(RmseArgs),
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Volume manifest JSON.
    #[arg(long)]
    manifest: PathBuf,

    /// Device to render with.
    #[arg(long, value_enum, default_value_t = DeviceChoice::Cpu)]
    device: DeviceChoice,

    /// Active asset index.
    #[arg(long, default_value_t = 0)]
    asset: usize,

    /// Noise id (1 white, 2 blue, 3 stbn, 4 fast, 5 ign).
    #[arg(long, default_value_t = 1)]
    noise: i32,

    /// Spatial filter id (1 none, 2 gaussian, 3 box3x3, 4 box5x5, 5 binom3x3, 6 binom5x5).
    #[arg(long, default_value_t = 1)]
    spatial: i32,

    /// Disable the temporal (EMA) filter.
    #[arg(long)]
    no_temporal: bool,

    /// Show the active noise layer instead of the volume.
    #[arg(long)]
    show_noise: bool,

    /// Scale for the per-pixel ray offset.
    #[arg(long)]
    noise_strength: Option<f32>,

    /// Override the manifest's output width.
    #[arg(long)]
    width: Option<u32>,

    /// Override the manifest's output height.
    #[arg(long)]
    height: Option<u32>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Frames to advance before writing.
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// Render the ground-truth reference instead.
    #[arg(long)]
    ground_truth: bool,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct CaptureArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Output directory.
    #[arg(long)]
    out_dir: PathBuf,

    /// Frames per run.
    #[arg(long, default_value_t = 32)]
    max_frames: usize,

    /// Frames rendered before the run starts.
    #[arg(long, default_value_t = 0)]
    warmup: u32,

    /// Compare grayscale instead of RGB.
    #[arg(long)]
    gray: bool,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Output directory.
    #[arg(long)]
    out_dir: PathBuf,

    /// Label appended to the volume name.
    #[arg(long, default_value = "snapshot")]
    label: String,

    /// Frames to advance before saving.
    #[arg(long, default_value_t = 1)]
    frames: u32,
}

#[derive(Args, Debug)]
struct RmseArgs {
    a: PathBuf,
    b: PathBuf,

    /// Compare grayscale instead of RGB.
    #[arg(long)]
    gray: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DeviceChoice {
    Cpu,
    Gpu,
}

type Pipeline = RenderPipeline<Box<dyn RenderDevice>>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Capture(args) => cmd_capture(args),
        Command::Snapshot(args) => cmd_snapshot(args),
        Command::Rmse(args) => cmd_rmse(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn make_device(choice: DeviceChoice) -> anyhow::Result<Box<dyn RenderDevice>> {
    let kind = match choice {
        DeviceChoice::Cpu => nanovolume::DeviceKind::Cpu,
        #[cfg(feature = "gpu")]
        DeviceChoice::Gpu => nanovolume::DeviceKind::Gpu,
        #[cfg(not(feature = "gpu"))]
        DeviceChoice::Gpu => anyhow::bail!("nanovolume was built without the `gpu` feature"),
    };
    Ok(nanovolume::create_device(kind)?)
}

fn open_session(args: &SessionArgs) -> anyhow::Result<(VolumeManifest, Pipeline)> {
    let manifest = VolumeManifest::from_path(&args.manifest)?;
    let mut opts = manifest.render.clone();
    if let Some(w) = args.width {
        opts.width = w;
    }
    if let Some(h) = args.height {
        opts.height = h;
    }

    let device = make_device(args.device)?;
    let mut pipeline = RenderPipeline::new(device, manifest.to_store(), opts, manifest.view)?;
    if let Some(dir) = &manifest.noise_dir {
        pipeline.load_noise_banks(dir);
    }

    let report = pipeline.load_assets(&VolumeLoader::new());
    if report.loaded == 0 {
        anyhow::bail!(
            "no volume in '{}' could be loaded",
            args.manifest.display()
        );
    }
    for (index, reason) in &report.failed {
        eprintln!("skipped asset {index}: {reason}");
    }

    pipeline.set_active_asset(args.asset)?;
    pipeline.set_noise_type(args.noise)?;
    pipeline.set_spatial_filter(args.spatial)?;
    if args.no_temporal {
        pipeline.toggle_temporal_filtering();
    }
    if args.show_noise {
        pipeline.toggle_show_noise();
    }
    if let Some(strength) = args.noise_strength
        && !pipeline.set_noise_strength(strength)
    {
        anyhow::bail!("invalid noise strength {strength}");
    }
    Ok((manifest, pipeline))
}

fn advance_frames(pipeline: &mut Pipeline, frames: u32) -> anyhow::Result<()> {
    for _ in 0..frames {
        match pipeline.advance() {
            TickReport::Rendered { .. } => {}
            TickReport::Idle => anyhow::bail!("active volume is not loaded"),
            TickReport::Skipped { reason, .. } => anyhow::bail!("frame failed: {reason}"),
        }
    }
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let (_, mut pipeline) = open_session(&args.session)?;
    pipeline.set_ground_truth(args.ground_truth);
    advance_frames(&mut pipeline, args.frames.max(1))?;

    let frame = pipeline.read_frame()?;
    ensure_parent_dir(&args.out)?;
    frame
        .save(&args.out)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_capture(args: CaptureArgs) -> anyhow::Result<()> {
    let (manifest, mut pipeline) = open_session(&args.session)?;
    advance_frames(&mut pipeline, args.warmup)?;

    let mut capture = ExperimentCapture::new(CaptureOpts {
        out_dir: args.out_dir,
        max_frames: args.max_frames,
        channels: if args.gray {
            Channels::Gray
        } else {
            Channels::Rgb
        },
        scene: manifest.scene.clone(),
    })?;
    capture.start();

    loop {
        advance_frames(&mut pipeline, 1)?;
        match capture.tick(&mut pipeline) {
            CaptureTick::Captured { .. } => {}
            CaptureTick::Saved(report) => {
                eprintln!(
                    "wrote {} frames + ground truth as '{}' (rmse {:.4})",
                    report.frame_paths.len(),
                    report.stem,
                    report.rmse
                );
                return Ok(());
            }
            CaptureTick::Failed { reason } => anyhow::bail!("capture failed: {reason}"),
            CaptureTick::NotRunning => anyhow::bail!("capture stopped unexpectedly"),
        }
    }
}

fn cmd_snapshot(args: SnapshotArgs) -> anyhow::Result<()> {
    let (_, mut pipeline) = open_session(&args.session)?;
    advance_frames(&mut pipeline, args.frames.max(1))?;
    let report = nanovolume::save_snapshot(
        &mut pipeline,
        &args.out_dir,
        &args.label,
        Channels::Rgb,
    )?;
    eprintln!(
        "wrote {} (rmse {:.4})",
        report.image_path.display(),
        report.rmse
    );
    Ok(())
}

fn read_rgb(path: &Path) -> anyhow::Result<image::RgbImage> {
    let img = image::open(path).with_context(|| format!("read image '{}'", path.display()))?;
    Ok(img.to_rgb8())
}

fn cmd_rmse(args: RmseArgs) -> anyhow::Result<()> {
    let a = read_rgb(&args.a)?;
    let b = read_rgb(&args.b)?;
    let channels = if args.gray {
        Channels::Gray
    } else {
        Channels::Rgb
    };
    let value = nanovolume::rmse(&a, &b, channels)?;
    println!("{value:.6}");
    Ok(())
}
