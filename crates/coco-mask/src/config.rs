use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::output::OutputFormat;

/// Side length of the square frame COCO polygons are usually exported against.
pub const DEFAULT_FRAME_SIDE: u32 = 640;

/// Default JPEG quality for written masks.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Width and height in pixels, written as `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_SIDE, DEFAULT_FRAME_SIDE)
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for FrameSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", s))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid dimension {:?} in {:?}", v, s))
        };
        let size = FrameSize::new(parse(w)?, parse(h)?);
        if size.width == 0 || size.height == 0 {
            return Err(format!("dimensions must be non-zero, got {}", size));
        }
        Ok(size)
    }
}

/// Settings for one mask build.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskConfig {
    /// Size of every written mask.
    pub size: FrameSize,
    /// Frame the polygon coordinates were authored against. Polygons are
    /// scaled by `size / reference` before filling.
    pub reference: FrameSize,
    pub format: OutputFormat,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            size: FrameSize::default(),
            reference: FrameSize::default(),
            format: OutputFormat::Jpeg {
                quality: DEFAULT_JPEG_QUALITY,
            },
        }
    }
}

impl MaskConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, size) in [("mask size", self.size), ("reference size", self.reference)] {
            if size.width == 0 || size.height == 0 {
                return Err(Error::Config(format!(
                    "{} must be non-zero, got {}",
                    name, size
                )));
            }
        }
        if let OutputFormat::Jpeg { quality } = self.format {
            if !(1..=100).contains(&quality) {
                return Err(Error::Config(format!(
                    "JPEG quality must be between 1 and 100, got {}",
                    quality
                )));
            }
        }
        Ok(())
    }

    /// Per-axis factors mapping reference coordinates onto the mask.
    pub fn scale(&self) -> (f64, f64) {
        (
            self.size.width as f64 / self.reference.width as f64,
            self.size.height as f64 / self.reference.height as f64,
        )
    }
}

/// Restricts which images and annotations take part in a build.
///
/// Empty lists do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageFilter {
    pub img_ids: Vec<u64>,
    pub cat_ids: Vec<u64>,
}

impl ImageFilter {
    pub fn accepts_image(&self, img_id: u64) -> bool {
        self.img_ids.is_empty() || self.img_ids.contains(&img_id)
    }

    pub fn accepts_category(&self, cat_id: u64) -> bool {
        self.cat_ids.is_empty() || self.cat_ids.contains(&cat_id)
    }
}
