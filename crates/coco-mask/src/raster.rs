//! Per-image mask buffer.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use crate::config::{FrameSize, MaskConfig};
use crate::mask;
use crate::types::{Rle, Segmentation};

pub const FOREGROUND: Luma<u8> = Luma([255]);

/// Why a polygon was left out of a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonSkip {
    /// The coordinate list has an odd length.
    OddCoordinates,
    /// Fewer than three distinct vertices remain after closing points are dropped.
    TooFewVertices,
    /// A scaled vertex falls outside the mask.
    OutOfBounds { x: i64, y: i64 },
}

/// Why an RLE was left out of a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RleSkip {
    /// The compressed counts string could not be decoded.
    Malformed,
    /// The RLE was encoded for a different mask size.
    SizeMismatch { h: u32, w: u32 },
}

/// Tally of what one segmentation contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaintOutcome {
    pub polygons_filled: usize,
    pub polygons_skipped: Vec<PolygonSkip>,
    pub rles_merged: usize,
    pub rles_skipped: Vec<RleSkip>,
}

/// A single-channel 0/255 mask that annotations are painted into.
pub struct MaskCanvas {
    buffer: GrayImage,
    scale: (f64, f64),
}

impl MaskCanvas {
    pub fn new(config: &MaskConfig) -> Self {
        let FrameSize { width, height } = config.size;
        Self {
            buffer: GrayImage::new(width, height),
            scale: config.scale(),
        }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn paint(&mut self, segmentation: &Segmentation) -> PaintOutcome {
        let mut outcome = PaintOutcome::default();
        match segmentation {
            Segmentation::Polygon(polygons) => {
                for polygon in polygons {
                    match self.fill_polygon(polygon) {
                        Ok(()) => outcome.polygons_filled += 1,
                        Err(skip) => outcome.polygons_skipped.push(skip),
                    }
                }
            }
            Segmentation::CompressedRle { size, counts } => {
                match mask::rle_from_string(counts, size[0], size[1]) {
                    Some(rle) => self.record_rle(&rle, &mut outcome),
                    None => outcome.rles_skipped.push(RleSkip::Malformed),
                }
            }
            Segmentation::UncompressedRle { size, counts } => {
                let rle = Rle {
                    h: size[0],
                    w: size[1],
                    counts: counts.clone(),
                };
                self.record_rle(&rle, &mut outcome);
            }
        }
        outcome
    }

    fn record_rle(&mut self, rle: &Rle, outcome: &mut PaintOutcome) {
        match self.union_rle(rle) {
            Ok(()) => outcome.rles_merged += 1,
            Err(skip) => outcome.rles_skipped.push(skip),
        }
    }

    /// Scale a flat `[x0, y0, x1, y1, ...]` polygon from the reference frame
    /// and fill it, boundary included.
    ///
    /// Coordinates are rounded half to even. The whole polygon is rejected if
    /// any vertex lands outside the mask.
    pub fn fill_polygon(&mut self, xy: &[f64]) -> Result<(), PolygonSkip> {
        if xy.len() % 2 != 0 {
            return Err(PolygonSkip::OddCoordinates);
        }
        let (sx, sy) = self.scale;
        let (w, h) = (self.width() as i64, self.height() as i64);

        let mut points: Vec<Point<i32>> = Vec::with_capacity(xy.len() / 2);
        for pair in xy.chunks_exact(2) {
            let x = (pair[0] * sx).round_ties_even();
            let y = (pair[1] * sy).round_ties_even();
            let (xi, yi) = (x as i64, y as i64);
            if !(x >= 0.0 && y >= 0.0 && xi < w && yi < h) {
                return Err(PolygonSkip::OutOfBounds { x: xi, y: yi });
            }
            points.push(Point::new(xi as i32, yi as i32));
        }

        // the fill closes the outline itself and rejects a repeated end point
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        points.dedup();
        if points.len() < 3 {
            return Err(PolygonSkip::TooFewVertices);
        }

        draw_polygon_mut(&mut self.buffer, &points, FOREGROUND);
        Ok(())
    }

    /// Merge an RLE into the mask as a union: foreground pixels become 255,
    /// everything else keeps its value.
    pub fn union_rle(&mut self, rle: &Rle) -> Result<(), RleSkip> {
        if rle.h != self.height() || rle.w != self.width() {
            return Err(RleSkip::SizeMismatch { h: rle.h, w: rle.w });
        }
        let decoded = mask::decode(rle);
        for (pixel, &bit) in self.buffer.iter_mut().zip(&decoded) {
            *pixel = (*pixel).max(bit * FOREGROUND.0[0]);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.iter().all(|&v| v == 0)
    }

    pub fn foreground_pixels(&self) -> usize {
        self.buffer.iter().filter(|&&v| v != 0).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    fn scaled_canvas(size: FrameSize, reference: FrameSize) -> MaskCanvas {
        MaskCanvas::new(&MaskConfig {
            size,
            reference,
            format: OutputFormat::Png,
        })
    }

    fn canvas(width: u32, height: u32) -> MaskCanvas {
        let size = FrameSize::new(width, height);
        scaled_canvas(size, size)
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<f64> {
        vec![x0, y0, x1, y0, x1, y1, x0, y1]
    }

    fn lit(canvas: &MaskCanvas, x: u32, y: u32) -> bool {
        canvas.as_image().get_pixel(x, y).0[0] == 255
    }

    #[test]
    fn test_fill_rectangle_exactly() {
        let mut c = canvas(64, 64);
        c.fill_polygon(&rect(10.0, 20.0, 30.0, 40.0)).unwrap();

        for y in 0..64 {
            for x in 0..64 {
                let inside = (10..=30).contains(&x) && (20..=40).contains(&y);
                assert_eq!(lit(&c, x, y), inside, "pixel ({}, {})", x, y);
            }
        }
        assert_eq!(c.foreground_pixels(), 21 * 21);
    }

    #[test]
    fn test_closed_polygon_is_accepted() {
        let mut c = canvas(16, 16);
        let mut closed = rect(2.0, 2.0, 5.0, 5.0);
        closed.extend([2.0, 2.0]);
        c.fill_polygon(&closed).unwrap();
        assert_eq!(c.foreground_pixels(), 16);
    }

    #[test]
    fn test_scale_from_reference_frame() {
        // 640 reference onto a 320 mask halves every coordinate
        let mut c = scaled_canvas(FrameSize::new(320, 320), FrameSize::new(640, 640));
        c.fill_polygon(&rect(100.0, 100.0, 200.0, 200.0)).unwrap();
        assert!(lit(&c, 50, 50) && lit(&c, 100, 100));
        assert!(!lit(&c, 49, 50) && !lit(&c, 101, 100));
    }

    #[test]
    fn test_rounds_half_to_even() {
        let mut c = canvas(16, 16);
        // 2.5 -> 2 and 5.5 -> 6
        c.fill_polygon(&rect(2.5, 2.5, 5.5, 5.5)).unwrap();
        assert!(lit(&c, 2, 2) && lit(&c, 6, 6));
        assert!(!lit(&c, 1, 2) && !lit(&c, 7, 6));
    }

    #[test]
    fn test_out_of_bounds_polygon_is_skipped() {
        let mut c = canvas(32, 32);
        assert_eq!(
            c.fill_polygon(&rect(4.0, 4.0, 32.0, 8.0)),
            Err(PolygonSkip::OutOfBounds { x: 32, y: 4 })
        );
        assert_eq!(
            c.fill_polygon(&rect(-1.0, 4.0, 8.0, 8.0)),
            Err(PolygonSkip::OutOfBounds { x: -1, y: 4 })
        );
        assert!(c.is_empty());
    }

    #[test]
    fn test_malformed_polygons_are_skipped() {
        let mut c = canvas(32, 32);
        assert_eq!(
            c.fill_polygon(&[1.0, 1.0, 5.0]),
            Err(PolygonSkip::OddCoordinates)
        );
        assert_eq!(
            c.fill_polygon(&[1.0, 1.0, 5.0, 5.0, 1.0, 1.0]),
            Err(PolygonSkip::TooFewVertices)
        );
        assert_eq!(c.fill_polygon(&[]), Err(PolygonSkip::TooFewVertices));
        assert!(c.is_empty());
    }

    #[test]
    fn test_rle_union_keeps_existing_pixels() {
        let mut c = canvas(4, 3);
        c.fill_polygon(&rect(0.0, 0.0, 1.0, 1.0)).unwrap();

        let mut bits = vec![0u8; 12];
        bits[5] = 1; // (1, 1), inside the square
        bits[11] = 1; // (3, 2)
        c.union_rle(&mask::encode(&bits, 3, 4)).unwrap();

        let expected: Vec<u8> = vec![
            255, 255, 0, 0, //
            255, 255, 0, 0, //
            0, 0, 0, 255, //
        ];
        assert_eq!(c.as_image().as_raw(), &expected);
    }

    #[test]
    fn test_rle_size_mismatch_is_skipped() {
        let mut c = canvas(4, 3);
        let rle = Rle {
            h: 4,
            w: 3,
            counts: vec![0, 12],
        };
        assert_eq!(c.union_rle(&rle), Err(RleSkip::SizeMismatch { h: 4, w: 3 }));
        assert!(c.is_empty());
    }

    #[test]
    fn test_paint_reports_outcome() {
        let mut c = canvas(8, 8);
        let polygons = Segmentation::Polygon(vec![
            rect(1.0, 1.0, 3.0, 3.0),
            rect(1.0, 1.0, 9.0, 3.0),
        ]);
        let outcome = c.paint(&polygons);
        assert_eq!(outcome.polygons_filled, 1);
        assert_eq!(
            outcome.polygons_skipped,
            vec![PolygonSkip::OutOfBounds { x: 9, y: 1 }]
        );

        let bad = Segmentation::CompressedRle {
            size: [8, 8],
            counts: "!!".to_string(),
        };
        assert_eq!(c.paint(&bad).rles_skipped, vec![RleSkip::Malformed]);
        let overlong = Segmentation::CompressedRle {
            size: [8, 8],
            counts: "PPPPPPPPPPPP@".to_string(),
        };
        assert_eq!(c.paint(&overlong).rles_skipped, vec![RleSkip::Malformed]);

        let good = Segmentation::UncompressedRle {
            size: [8, 8],
            counts: vec![0, 64],
        };
        assert_eq!(c.paint(&good).rles_merged, 1);
        assert_eq!(c.foreground_pixels(), 64);
    }
}
