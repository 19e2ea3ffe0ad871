//! Rasterize COCO segmentations (polygons and RLE) into binary mask images.

pub mod builder;
pub mod coco;
pub mod config;
pub mod error;
pub mod mask;
pub mod output;
pub mod raster;
pub mod types;

pub use builder::{build_masks, build_masks_from, BuildReport};
pub use coco::COCO;
pub use config::{FrameSize, ImageFilter, MaskConfig};
pub use error::{Error, Result};
pub use output::OutputFormat;
pub use raster::MaskCanvas;
pub use types::{Annotation, Dataset, Image, Rle, Segmentation};
