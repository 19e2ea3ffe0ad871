use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use coco_mask::config::{DEFAULT_JPEG_QUALITY, DEFAULT_FRAME_SIDE};
use coco_mask::{build_masks, FrameSize, ImageFilter, MaskConfig, OutputFormat};
use log::info;

#[derive(Parser)]
#[command(name = "coco-mask", version)]
#[command(
    about = "Write one binary mask image per annotated image of a COCO file, from polygon and RLE segmentations"
)]
struct Cli {
    /// Path to the COCO annotations JSON file
    #[arg(short, long)]
    annotations: PathBuf,

    /// Directory the masks are written to (created if missing)
    #[arg(short, long)]
    output: PathBuf,

    /// Mask size as WIDTHxHEIGHT
    #[arg(long, default_value_t = FrameSize::new(DEFAULT_FRAME_SIDE, DEFAULT_FRAME_SIDE))]
    size: FrameSize,

    /// Frame the polygon coordinates were drawn in, as WIDTHxHEIGHT
    #[arg(long, default_value_t = FrameSize::new(DEFAULT_FRAME_SIDE, DEFAULT_FRAME_SIDE))]
    reference_size: FrameSize,

    /// Output encoding: jpeg keeps the image file name, png swaps the extension
    #[arg(long, value_enum, default_value = "jpeg")]
    format: Format,

    /// JPEG quality (1-100)
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Only write masks for these image IDs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    img_ids: Option<Vec<u64>>,

    /// Only draw annotations of these category IDs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    cat_ids: Option<Vec<u64>>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Format {
    Jpeg,
    Png,
}

impl Cli {
    fn mask_config(&self) -> MaskConfig {
        let format = match self.format {
            Format::Jpeg => OutputFormat::Jpeg {
                quality: self.jpeg_quality,
            },
            Format::Png => OutputFormat::Png,
        };
        MaskConfig {
            size: self.size,
            reference: self.reference_size,
            format,
        }
    }

    fn filter(&self) -> ImageFilter {
        ImageFilter {
            img_ids: self.img_ids.clone().unwrap_or_default(),
            cat_ids: self.cat_ids.clone().unwrap_or_default(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = cli.mask_config();
    info!(
        "Writing {}x{} masks ({:?}) to {:?}",
        config.size.width, config.size.height, cli.format, cli.output
    );

    let report = build_masks(&cli.annotations, &cli.output, &config, &cli.filter())
        .with_context(|| format!("failed to build masks from {:?}", cli.annotations))?;
    report.log_summary();

    Ok(())
}
