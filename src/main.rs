//! `sorvf` binary: fuse an AIS export with recorded detector output.
//!
//! ```bash
//! sorvf --config camera.json --ais ais.csv --detections dets.json \
//!       --frames clip-01/frames --out-dir result/
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sorvf_rs::ais::read_csv_file;
use sorvf_rs::integration::{
    BoxFormat, DetectionFile, FrameSource, FusionPipeline, ImageSequenceSink, ImageSequenceSource,
    TimingSource,
};
use sorvf_rs::render::load_font;
use sorvf_rs::{ImageSize, Result, SorvfConfig};

#[derive(Parser, Debug)]
#[command(name = "sorvf", version, about = "AIS and camera vessel trajectory fusion", long_about = None)]
struct Args {
    /// JSON run configuration; must contain a `calibration` section.
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// AIS CSV export.
    #[arg(long, value_name = "FILE")]
    ais: PathBuf,

    /// Recorded detector output (JSON).
    #[arg(long, value_name = "FILE")]
    detections: PathBuf,

    /// Layout of the boxes in the detection file.
    #[arg(long, value_enum, default_value_t = BoxLayout::Tlbr)]
    box_format: BoxLayout,

    /// Directory of frame images. Without it only the JSON records are written.
    #[arg(long, value_name = "DIR")]
    frames: Option<PathBuf>,

    /// Frame width when no frame directory is given.
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Frame height when no frame directory is given.
    #[arg(long, default_value_t = 1080)]
    height: u32,

    #[arg(long, default_value_t = 25.0)]
    fps: f64,

    /// Override the tracker's anti-occlusion switch.
    #[arg(long, value_name = "BOOL")]
    anti: Option<bool>,

    /// Seconds a hidden track coasts on predicted motion; overrides the config.
    #[arg(long, value_name = "SECONDS")]
    anti_rate: Option<f32>,

    #[arg(long, value_name = "DIR", default_value = "result")]
    out_dir: PathBuf,

    /// TrueType/OpenType font for the info labels.
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BoxLayout {
    Tlbr,
    Xywh,
    Tlwh,
}

impl From<BoxLayout> for BoxFormat {
    fn from(layout: BoxLayout) -> Self {
        match layout {
            BoxLayout::Tlbr => BoxFormat::Tlbr,
            BoxLayout::Xywh => BoxFormat::Xywh,
            BoxLayout::Tlwh => BoxFormat::Tlwh,
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = SorvfConfig::from_json_file(&args.config)?;
    if let Some(anti) = args.anti {
        config.tracker.anti = anti;
    }
    if let Some(seconds) = args.anti_rate {
        config.tracker.anti_rate_s = Some(seconds);
    }
    let batch = read_csv_file(&args.ais)?;
    let mut detections = DetectionFile::from_json_file(&args.detections, args.box_format.into())?;
    let font = args.font.as_deref().map(load_font).transpose()?;

    match &args.frames {
        Some(dir) => {
            let mut source = ImageSequenceSource::open(dir, args.fps)?;
            let mut sink = ImageSequenceSink::create(args.out_dir.join("frames"))?;
            let mut pipeline =
                FusionPipeline::new(&config, batch.records, source.frame_size(), source.fps(), font)?;
            let outcome = pipeline.run(&mut source, &mut detections, Some(&mut sink));
            pipeline.write_outputs(&args.out_dir)?;
            outcome?;
        }
        None => {
            let size = ImageSize::new(args.width, args.height);
            let mut source = TimingSource::new(size, args.fps, detections.frame_count());
            let mut pipeline = FusionPipeline::new(&config, batch.records, size, args.fps, font)?;
            let outcome = pipeline.run(&mut source, &mut detections, None::<&mut ImageSequenceSink>);
            pipeline.write_outputs(&args.out_dir)?;
            outcome?;
        }
    }

    info!(out_dir = %args.out_dir.display(), "done");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
