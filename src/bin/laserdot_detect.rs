//! laserdot_detect - one-shot detection on a still image
//!
//! Prints the detection (or `null`) as JSON on stdout. With `--regions` the
//! full labelled region set is printed as well.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use laserdot::{Detection, LabeledRegions, LaserPipeline, LaserdotConfig, Scratch};

#[derive(Parser, Debug)]
#[command(
    name = "laserdot_detect",
    about = "Locate a laser dot in an image file"
)]
struct Args {
    /// Image to analyse (PNG or JPEG)
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Config file (TOML, or JSON with a .json extension)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Include every labelled region in the output
    #[arg(long)]
    regions: bool,

    /// Pretty-print the JSON
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    image: String,
    width: u32,
    height: u32,
    detection: Option<&'a Detection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    regions: Option<&'a LabeledRegions>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => LaserdotConfig::from_path(path)?,
        None => LaserdotConfig::default(),
    };

    let frame = image::open(&args.image)
        .with_context(|| format!("decode {}", args.image.display()))?
        .to_rgb8();
    let (width, height) = frame.dimensions();

    let pipeline = LaserPipeline::new(cfg.detection)?;
    let mut scratch = Scratch::new(width, height);
    let analysis = pipeline.analyze(&frame, &mut scratch)?;
    log::info!(
        "{}: {} foreground regions",
        args.image.display(),
        analysis.regions.foreground_count()
    );

    let report = Report {
        image: args.image.display().to_string(),
        width,
        height,
        detection: analysis.detection.as_ref(),
        regions: args.regions.then_some(&analysis.regions),
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}
